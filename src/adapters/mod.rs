//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                    | Connects to                |
//! |-------------|-------------------------------|----------------------------|
//! | `eeprom`    | ConfigPort                    | any StoragePort            |
//! |             | StoragePort (`MemEeprom`)     | in-memory EEPROM image     |
//! | `hardware`  | SensorPort, ActuatorPort      | embedded-hal pins, ADC     |
//! |             | ClockPort, DelayNs            |                            |
//! | `sim`       | RtcDevice, SerialPort         | host clock, stdin/stdout   |
//! | `time`      | ClockPort, DelayNs            | `std::time`                |

pub mod eeprom;
pub mod hardware;
pub mod sim;
pub mod time;
