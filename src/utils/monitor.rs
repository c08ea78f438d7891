#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

/// 單一階段處理的項目數（食譜、食材行、清單項目）
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMetric {
    pub phase: String,
    pub items: usize,
    pub items_per_sec: f64,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct ProcessStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

/// 產生清單時各階段的吞吐量，附帶行程 CPU / 記憶體
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    last_phase: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    phases: Mutex<Vec<PhaseMetric>>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let (system, pid) = if enabled {
            let mut system = System::new_with_specifics(RefreshKind::everything());
            system.refresh_all();
            (system, sysinfo::get_current_pid().ok())
        } else {
            (System::new(), None)
        };

        let now = Instant::now();
        Self {
            system: Mutex::new(system),
            pid,
            start_time: now,
            last_phase: Mutex::new(now),
            peak_memory: Mutex::new(0),
            phases: Mutex::new(Vec::new()),
            enabled,
        }
    }

    fn process_stats(&self) -> Option<ProcessStats> {
        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(ProcessStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
        })
    }

    /// 記錄一個階段結束；`items` 為該階段處理的項目數
    pub fn log_phase(&self, phase: &str, items: usize) {
        if !self.enabled {
            return;
        }

        let elapsed = match self.last_phase.lock() {
            Ok(mut last) => {
                let elapsed = last.elapsed();
                *last = Instant::now();
                elapsed
            }
            Err(_) => Duration::ZERO,
        };
        let secs = elapsed.as_secs_f64();
        let items_per_sec = if secs > 0.0 { items as f64 / secs } else { 0.0 };

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(PhaseMetric {
                phase: phase.to_string(),
                items,
                items_per_sec,
            });
        }

        match self.process_stats() {
            Some(stats) => tracing::info!(
                "📊 {} - {} items in {:?} ({:.0}/s), CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                items,
                elapsed,
                items_per_sec,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            ),
            None => tracing::info!("📊 {} - {} items in {:?} ({:.0}/s)", phase, items, elapsed, items_per_sec),
        }
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self.peak_memory.lock().map(|p| *p).unwrap_or_default();
        let summary: Vec<String> = self
            .phase_metrics()
            .iter()
            .map(|m| format!("{}={}", m.phase, m.items))
            .collect();
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB, Phases: {}",
            self.start_time.elapsed(),
            peak,
            summary.join(", ")
        );
    }

    pub fn phase_metrics(&self) -> Vec<PhaseMetric> {
        self.phases.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 環境（嵌入服務）提供空實現
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_phase(&self, _phase: &str, _items: usize) {}

    pub fn log_final_stats(&self) {}

    pub fn phase_metrics(&self) -> Vec<PhaseMetric> {
        Vec::new()
    }

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_records_nothing() {
        let monitor = SystemMonitor::new(false);
        monitor.log_phase("aggregate", 120);
        assert!(!monitor.is_enabled());
        assert!(monitor.phase_metrics().is_empty());
    }

    #[test]
    fn test_enabled_monitor_records_phase_items() {
        let monitor = SystemMonitor::new(true);
        monitor.log_phase("select", 3);
        monitor.log_phase("aggregate", 42);
        monitor.log_final_stats();

        let metrics = monitor.phase_metrics();
        let counts: Vec<(&str, usize)> = metrics.iter().map(|m| (m.phase.as_str(), m.items)).collect();
        assert_eq!(counts, vec![("select", 3), ("aggregate", 42)]);
        assert!(metrics.iter().all(|m| m.items_per_sec >= 0.0));
    }
}
