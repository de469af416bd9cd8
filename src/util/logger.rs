use std::fmt::{Debug, Display, Formatter};

use super::Log;

impl<T: Display> Display for Log<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Log::None => Ok(()),
            Log::Default(s) | Log::Success(s) | Log::Result(s) | Log::Verbose(s) => {
                write!(f, "{}", s)
            }
        }
    }
}

impl<T> Log<T> {
    /// Function which return order of the log.
    pub fn order(&self) -> u8 {
        match self {
            Log::None => 0,
            Log::Default(_) => 1,
            Log::Success(_) => 2,
            Log::Result(_) => 3,
            Log::Verbose(_) => 4,
        }
    }
}

impl<TL: Display> Log<TL> {
    pub fn log_step<T: Debug>(&self, label: &str, value: &T) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Verbose(()).order() {
            println!("[{}; {}]: {:?}", self, label, value);
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = (label, value);
        }
    }

    pub fn log_event(&self, label: &str, message: &str) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Result(()).order() {
            println!("[{}; {}]: {}", self, label, message);
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = (label, message);
        }
    }

    pub fn log_success(&self, label: &str, message: &str) {
        #[cfg(debug_assertions)]
        if self.order() >= Log::Success(()).order() {
            println!("[{}; {}]: {}", self, label, message);
        }
        #[cfg(not(debug_assertions))]
        {
            let _ = (label, message);
        }
    }
}
