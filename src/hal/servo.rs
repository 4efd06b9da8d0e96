//! Servo actuator driven through the Linux sysfs PWM interface.
//!
//! The bollard servo is a standard hobby servo on a 50 Hz frame. Position is
//! set by the high time of each pulse:
//!
//! - Open: 1.1 ms (duty 11/200 of the frame)
//! - Closed: 2.5 ms (duty 25/200 of the frame)
//!
//! On a Raspberry Pi, enable the PWM overlay (`dtoverlay=pwm,pin=18,func=2`)
//! and the channel shows up under `/sys/class/pwm/pwmchip0`.
//!
//! Control logic:
//! - `open`: export the channel if needed, write `period`, zero duty, enable
//! - `move_to`: write `duty_cycle` for the target, then hold for the settle time

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info};

use crate::commands::BollardState;
use crate::config::ActuatorConfig;
use crate::traits::ActuatorPort;

/// Errors from the sysfs servo.
#[derive(Debug, thiserror::Error)]
pub enum ServoError {
    /// A sysfs attribute could not be read or written.
    #[error("pwm sysfs {path}: {source}")]
    Io {
        /// Attribute path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Calibration does not fit in the PWM period.
    #[error("duty {duty_ns} ns does not fit in period {period_ns} ns")]
    DutyOutOfRange {
        /// Offending duty.
        duty_ns: u64,
        /// Configured period.
        period_ns: u64,
    },
}

/// Servo on a sysfs PWM channel.
///
/// # Example
///
/// ```ignore
/// use rs_bollard::config::ActuatorConfig;
/// use rs_bollard::hal::SysfsServo;
/// use rs_bollard::traits::ActuatorPort;
/// use rs_bollard::BollardState;
///
/// let mut servo = SysfsServo::open(&ActuatorConfig::default())?;
/// servo.move_to(BollardState::Open).await?; // returns after ~1 s
/// ```
#[derive(Debug)]
pub struct SysfsServo {
    channel_dir: PathBuf,
    open_duty_ns: u64,
    closed_duty_ns: u64,
    settle: Duration,
}

impl SysfsServo {
    /// Export (if needed) and enable the configured PWM channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the calibration does not fit the period or a
    /// sysfs write fails.
    pub fn open(config: &ActuatorConfig) -> Result<Self, ServoError> {
        for duty_ns in [config.open_duty_ns, config.closed_duty_ns] {
            if duty_ns >= config.period_ns {
                return Err(ServoError::DutyOutOfRange {
                    duty_ns,
                    period_ns: config.period_ns,
                });
            }
        }

        let chip_dir = config
            .sysfs_root
            .join(format!("pwmchip{}", config.chip));
        let channel_dir = chip_dir.join(format!("pwm{}", config.channel));

        if !channel_dir.exists() {
            write_attr(&chip_dir.join("export"), config.channel)?;
            debug!(channel = config.channel, chip = config.chip, "exported pwm channel");
        }

        write_attr(&channel_dir.join("duty_cycle"), 0)?;
        write_attr(&channel_dir.join("period"), config.period_ns)?;
        write_attr(&channel_dir.join("enable"), 1)?;

        info!(
            path = %channel_dir.display(),
            period_ns = config.period_ns,
            "servo pwm enabled"
        );

        Ok(Self {
            channel_dir,
            open_duty_ns: config.open_duty_ns,
            closed_duty_ns: config.closed_duty_ns,
            settle: config.settle(),
        })
    }

    /// Duty cycle used for `position`.
    pub fn duty_for(&self, position: BollardState) -> u64 {
        match position {
            BollardState::Open => self.open_duty_ns,
            BollardState::Closed => self.closed_duty_ns,
        }
    }

    /// Channel directory in sysfs.
    pub fn channel_dir(&self) -> &Path {
        &self.channel_dir
    }
}

impl ActuatorPort for SysfsServo {
    type Error = ServoError;

    async fn move_to(&mut self, position: BollardState) -> Result<(), ServoError> {
        let duty = self.duty_for(position);
        let path = self.channel_dir.join("duty_cycle");
        tokio::fs::write(&path, duty.to_string())
            .await
            .map_err(|source| ServoError::Io { path, source })?;
        debug!(%position, duty_ns = duty, "servo duty written");
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    fn settle_time(&self) -> Duration {
        self.settle
    }
}

fn write_attr(path: &Path, value: impl ToString) -> Result<(), ServoError> {
    fs::write(path, value.to_string()).map_err(|source| ServoError::Io {
        path: path.to_path_buf(),
        source,
    })
}
