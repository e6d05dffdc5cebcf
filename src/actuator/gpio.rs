// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/shelfwatch-rs

//! Linux sysfs GPIO outputs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use super::AlarmOutputs;
use crate::error::ActuatorError;

/// A single exported output pin
pub struct SysfsPin {
    pin: u32,
    value: PathBuf,
}

impl SysfsPin {
    /// Export the pin if needed and configure it as an output
    pub fn open(root: &Path, pin: u32) -> Result<Self, ActuatorError> {
        let dir = root.join(format!("gpio{}", pin));

        if !dir.exists() {
            fs::write(root.join("export"), pin.to_string()).map_err(|e| gpio_err(pin, "export", e))?;
        }
        fs::write(dir.join("direction"), "out").map_err(|e| gpio_err(pin, "direction", e))?;

        Ok(Self {
            pin,
            value: dir.join("value"),
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    pub fn write(&self, high: bool) -> Result<(), ActuatorError> {
        fs::write(&self.value, if high { "1" } else { "0" }).map_err(|e| gpio_err(self.pin, "value", e))
    }
}

fn gpio_err(pin: u32, attr: &str, e: std::io::Error) -> ActuatorError {
    ActuatorError::Gpio {
        pin,
        message: format!("{}: {}", attr, e),
    }
}

/// Buzzer and light on two sysfs pins
pub struct SysfsGpio {
    buzzer: SysfsPin,
    light: SysfsPin,
}

impl SysfsGpio {
    pub fn open(root: &Path, buzzer_pin: u32, light_pin: u32) -> Result<Self, ActuatorError> {
        let gpio = Self {
            buzzer: SysfsPin::open(root, buzzer_pin)?,
            light: SysfsPin::open(root, light_pin)?,
        };
        info!(
            "GPIO outputs ready: buzzer on pin {}, light on pin {}",
            gpio.buzzer.pin(),
            gpio.light.pin()
        );
        Ok(gpio)
    }
}

impl AlarmOutputs for SysfsGpio {
    fn set_outputs(&self, buzzer: bool, light: bool) -> Result<(), ActuatorError> {
        // Attempt both even if the first fails
        let buzzer = self.buzzer.write(buzzer);
        let light = self.light.write(light);
        buzzer.and(light)
    }
}
