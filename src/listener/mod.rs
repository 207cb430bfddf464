use crate::event::Listener;

mod audit;
mod ready;
mod slash;
mod trace;

/// Ordered list of built-in listeners
pub fn listeners() -> Vec<Box<dyn Listener>> {
    vec![
        Box::new(ready::Ready),
        Box::new(slash::RegisterSlash),
        Box::new(trace::Trace),
        Box::new(audit::Audit),
    ]
}
