mod clock;
mod machine;
mod scheduler;
mod session;

pub use clock::{Clock, ManualClock, SystemClock};
pub use machine::{ListenerId, MachineState, Subscription, TimerMachine, TICK_INTERVAL};
pub use scheduler::{ManualScheduler, Scheduler, TickHandle, TickTask, TokioScheduler};
pub use session::{SessionSnapshot, TimerComputed, TimerSession, DEFAULT_COUNTDOWN_SECONDS};
