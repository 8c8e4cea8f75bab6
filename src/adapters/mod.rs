//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter         | Implements                         | Connects to                |
//! |-----------------|------------------------------------|----------------------------|
//! | `gpio`          | Motion/Gas/Alarm/Servo ports       | `embedded-hal` 1.0 pins    |
//! | `sim`           | every hardware port                | in-memory simulated board  |
//! | `log_sink`      | EventSink                          | `log` facade               |
//! | `log_publisher` | TelemetryPort                      | `log` facade (JSON body)   |
//! | `time`          | ClockPort                          | local system clock         |

pub mod gpio;
pub mod log_publisher;
pub mod log_sink;
pub mod sim;
pub mod time;
