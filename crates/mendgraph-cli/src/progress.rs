use colored::Colorize;
use mendgraph_engine::ProgressReporter;

/// Phase messages and a coarse percentage on stderr.
pub struct StderrProgress {
    enabled: bool,
    maximum: u64,
    last_percent: u64,
}

impl StderrProgress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            maximum: 0,
            last_percent: 0,
        }
    }
}

impl ProgressReporter for StderrProgress {
    fn set_maximum(&mut self, maximum: u64) {
        self.maximum = maximum;
        self.last_percent = 0;
    }

    fn set_position(&mut self, position: u64) {
        if !self.enabled || self.maximum == 0 {
            return;
        }
        let percent = position.min(self.maximum) * 100 / self.maximum;
        // Every 10%.
        if percent / 10 > self.last_percent / 10 {
            eprintln!("  {} {percent}%", "..".dimmed());
        }
        self.last_percent = percent;
    }

    fn set_message(&mut self, message: &str) {
        self.last_percent = 0;
        if self.enabled {
            eprintln!("{} {message}", "→".yellow());
        }
    }
}
