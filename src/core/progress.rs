use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::types::{ProgressCallback, ProgressSnapshot};

/// 虚拟进度在任务结算前的上限，剩下 5% 留给真正完成的时刻
const VIRTUAL_CAP: f64 = 95.0;
/// 每次 tick 最多前进的点数
const MAX_STEP: f64 = 10.0;
/// 默认 tick 间隔
pub(crate) const DEFAULT_TICK: Duration = Duration::from_millis(300);

/// 虚拟进度推进规则：越接近上限涨得越慢
pub(crate) fn advance_virtual(progress: f64) -> f64 {
    let increment = ((100.0 - progress) / 20.0).min(MAX_STEP);
    (progress + increment).min(VIRTUAL_CAP)
}

struct ProgressState {
    /// 每个任务的进度，按提交下标对齐
    file_progress: Vec<f64>,
    settled: usize,
    success: usize,
    failed: usize,
    /// 只在任务结算时累加
    uploaded_bytes: u64,
}

/// 一个批次的进度看板
///
/// 聚合各任务的虚拟进度，算出加权百分比、速度和预计剩余时间，
/// 同时持有每个任务的虚拟进度定时器句柄，保证批次退出前全部清理。
pub(crate) struct BatchProgress {
    sizes: Vec<u64>,
    total_bytes: u64,
    tick: Duration,
    started_at: Instant,
    state: Mutex<ProgressState>,
    timers: Mutex<HashMap<usize, JoinHandle<()>>>,
    callback: Option<ProgressCallback>,
}

impl BatchProgress {
    pub fn new(sizes: Vec<u64>, tick: Duration, callback: Option<ProgressCallback>) -> Arc<Self> {
        let total_bytes = sizes.iter().sum();
        let total = sizes.len();
        Arc::new(Self {
            sizes,
            total_bytes,
            tick,
            started_at: Instant::now(),
            state: Mutex::new(ProgressState {
                file_progress: vec![0.0; total],
                settled: 0,
                success: 0,
                failed: 0,
                uploaded_bytes: 0,
            }),
            timers: Mutex::new(HashMap::new()),
            callback,
        })
    }

    /// 启动某个任务的虚拟进度定时器
    pub fn start_virtual(self: Arc<Self>, index: usize, name: &str) {
        let board = Arc::clone(&self);
        let name = name.to_string();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(board.tick);
            // interval 的第一次 tick 立即返回，跳过
            interval.tick().await;

            let mut progress = 0.0f64;
            while progress < VIRTUAL_CAP {
                interval.tick().await;
                progress = advance_virtual(progress);
                board.update(index, &name, progress);
            }
        });

        // 同一个任务不会启动两次，但旧句柄存在时也不能泄漏
        if let Some(old) = self.timers.lock().unwrap().insert(index, handle) {
            old.abort();
        }
    }

    /// 停止虚拟进度定时器，可重复调用
    pub fn stop_virtual(&self, index: usize) {
        if let Some(handle) = self.timers.lock().unwrap().remove(&index) {
            handle.abort();
        }
    }

    /// 更新单个任务的进度并发出快照
    ///
    /// 单任务进度只增不减，abort 竞态下迟到的 tick 不会把已结算的
    /// 100% 拉回去，总体 percent 因此保持单调。快照在持锁状态下
    /// 发出，保证回调收到的序列和状态变化同序。
    pub fn update(&self, index: usize, name: &str, percent: f64) {
        let mut state = self.state.lock().unwrap();
        if percent > state.file_progress[index] {
            state.file_progress[index] = percent;
        }
        self.emit(self.snapshot(&state, name));
    }

    /// 任务结算：进度强制 100，计数与已传字节一并更新
    pub fn settle(&self, index: usize, name: &str, size: u64, success: bool) {
        self.stop_virtual(index);

        let mut state = self.state.lock().unwrap();
        state.file_progress[index] = 100.0;
        state.settled += 1;
        if success {
            state.success += 1;
        } else {
            state.failed += 1;
        }
        state.uploaded_bytes += size;
        self.emit(self.snapshot(&state, name));
    }

    /// 兜底清理：批次返回前取消所有残留定时器
    pub fn sweep(&self) {
        for (_, handle) in self.timers.lock().unwrap().drain() {
            handle.abort();
        }
    }

    fn snapshot(&self, state: &ProgressState, name: &str) -> ProgressSnapshot {
        let total = self.sizes.len();

        let percent = if self.total_bytes > 0 {
            state
                .file_progress
                .iter()
                .zip(self.sizes.iter())
                .map(|(p, size)| p * (*size as f64 / self.total_bytes as f64))
                .sum()
        } else if total > 0 {
            // 全空文件时按个数退化计算
            state.settled as f64 / total as f64 * 100.0
        } else {
            100.0
        };

        let elapsed = self.started_at.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            state.uploaded_bytes as f64 / elapsed
        } else {
            0.0
        };

        let remaining_bytes = self.total_bytes.saturating_sub(state.uploaded_bytes);
        let remaining_time = if speed > 0.0 {
            Duration::from_secs_f64(remaining_bytes as f64 / speed)
        } else {
            Duration::ZERO
        };

        ProgressSnapshot {
            current: state.settled,
            total,
            success: state.success,
            failed: state.failed,
            current_file_name: name.to_string(),
            percent,
            speed,
            remaining_time,
        }
    }

    fn emit(&self, snapshot: ProgressSnapshot) {
        if let Some(callback) = &self.callback {
            callback(snapshot);
        }
    }
}
