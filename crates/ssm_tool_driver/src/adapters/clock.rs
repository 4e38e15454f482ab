use std::time::Duration;

use chrono::Utc;

pub trait Clock {
    /// UTC stamp appended to execution names, e.g. `20240102030405123456`.
    fn timestamp(&self) -> String;

    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn timestamp(&self) -> String {
        Utc::now().format("%Y%m%d%H%M%S%6f").to_string()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
