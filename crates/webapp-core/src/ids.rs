use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(pub u64);

impl Display for WindowId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "window:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(pub u64);

impl Display for CallbackId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "callback:{}", self.0)
    }
}
