use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::progress::{BatchProgress, DEFAULT_TICK};
use super::types::{BatchResult, FailedUpload, ImageRecord, ProgressCallback, UploadFile};
use super::uploader::{ImageHost, ImageUploader};

/// 默认并发数
const DEFAULT_CONCURRENCY: usize = 3;

/// 批量上传调度器
///
/// 固定大小的 worker 池共享一个 FIFO 队列：谁先传完谁先去取下一个
/// 文件，没有按下标分块。单个文件的失败只计入 `failed`，不会中断
/// 批次；整个批次总是跑完所有文件后才返回。
pub struct BatchUploader {
    uploader: ImageUploader,
    concurrency: usize,
    tick: Duration,
}

impl BatchUploader {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self {
            uploader: ImageUploader::new(host),
            concurrency: DEFAULT_CONCURRENCY,
            tick: DEFAULT_TICK,
        }
    }

    /// 并发数下限为 1，超过文件数时有效并行度就是文件数
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// 虚拟进度 tick 间隔，主要给测试用
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// 批量上传入口
    ///
    /// 空列表立即返回全零结果，不触发任何进度回调。返回前清理所有
    /// 残留的虚拟进度定时器。本函数从不失败，单文件错误都转成数据。
    pub async fn upload_batch(
        &self,
        files: Vec<UploadFile>,
        on_progress: Option<ProgressCallback>,
    ) -> BatchResult {
        let total = files.len();
        if total == 0 {
            return BatchResult::default();
        }

        let sizes: Vec<u64> = files.iter().map(|file| file.size()).collect();
        let board = BatchProgress::new(sizes, self.tick, on_progress);

        let queue: Mutex<VecDeque<(usize, UploadFile)>> =
            Mutex::new(files.into_iter().enumerate().collect());
        let outcomes: Mutex<(Vec<ImageRecord>, Vec<FailedUpload>)> =
            Mutex::new((Vec::new(), Vec::new()));

        let workers = (0..self.concurrency.min(total)).map(|_| self.worker(&queue, &board, &outcomes));
        futures::future::join_all(workers).await;

        // 兜底清理，正常路径下每个定时器在结算时已经停掉
        board.sweep();

        let (success, failed) = outcomes.into_inner().unwrap();
        BatchResult {
            total,
            success_count: success.len(),
            failed_count: failed.len(),
            success,
            failed,
        }
    }

    /// 单个 worker 循环：原子地取一个文件或退出
    async fn worker(
        &self,
        queue: &Mutex<VecDeque<(usize, UploadFile)>>,
        board: &Arc<BatchProgress>,
        outcomes: &Mutex<(Vec<ImageRecord>, Vec<FailedUpload>)>,
    ) {
        loop {
            let next = queue.lock().unwrap().pop_front();
            let Some((index, file)) = next else {
                break;
            };

            Arc::clone(board).start_virtual(index, &file.name);
            board.update(index, &file.name, 0.0);

            match self.uploader.upload(&file).await {
                Ok(record) => {
                    tracing::debug!(name = %file.name, url = %record.url, "upload succeeded");
                    outcomes.lock().unwrap().0.push(record);
                    board.settle(index, &file.name, file.size(), true);
                }
                Err(err) => {
                    tracing::warn!(name = %file.name, error = %err, "upload failed");
                    let name = file.name.clone();
                    let size = file.size();
                    outcomes.lock().unwrap().1.push(FailedUpload {
                        file,
                        error_message: err.to_string(),
                    });
                    board.settle(index, &name, size, false);
                }
            }
        }
    }
}
