//! Hardware adapter: bridges sensor channels to [`SensorPort`].
//!
//! [`SensorHub`] owns one channel per sensor type and turns a
//! `(meta, read_mask)` request into an ID-major [`SampleBuffer`]: every
//! masked ID is sampled `num_resamples` times back to back, unmasked IDs
//! are zero-filled and masked out of the buffer.
//!
//! ## Dual-target design
//!
//! On ESP-IDF the analog channels are ADC1 oneshot reads.  On host/test
//! any type implementing the channel traits plugs in.

use heapless::Vec;

use crate::app::ports::SensorPort;
use crate::error::{Error, Result};
use crate::events::{Climate, SensorKind};
use crate::sensors::{MAX_RAW_SAMPLES, SampleBuffer, SensorMeta};

#[cfg(target_os = "espidf")]
pub use self::adc::{Adc1, AdcBank};

/// A bank of scalar sensors addressed by ID.
pub trait ScalarChannel {
    fn sample(&mut self, id: usize) -> Result<u32>;
}

/// A bank of temperature/humidity probes addressed by ID.
pub trait ClimateChannel {
    fn sample(&mut self, id: usize) -> Result<Climate>;
}

/// Stand-in for an air probe that is not fitted.  Every read fails, so the
/// pipeline reports the air sensor as failed and the fan never runs.
#[derive(Debug, Default)]
pub struct NoClimateProbe;

impl ClimateChannel for NoClimateProbe {
    fn sample(&mut self, _id: usize) -> Result<Climate> {
        Err(Error::SensorFail)
    }
}

pub struct SensorHub<S, A, L> {
    pub soil: S,
    pub air: A,
    pub light: L,
}

impl<S, A, L> SensorHub<S, A, L> {
    pub fn new(soil: S, air: A, light: L) -> Self {
        Self { soil, air, light }
    }
}

impl<S: ScalarChannel, A: ClimateChannel, L: ScalarChannel> SensorPort for SensorHub<S, A, L> {
    fn read(&mut self, meta: &SensorMeta, read_mask: u16) -> Result<SampleBuffer> {
        let buffer = match meta.kind {
            SensorKind::SoilMoisture => {
                let values = collect(meta, read_mask, 0, |id| self.soil.sample(id))?;
                SampleBuffer::from_scalars(meta.kind, meta.num_items, meta.num_resamples, &values)?
            }
            SensorKind::Lightness => {
                let values = collect(meta, read_mask, 0, |id| self.light.sample(id))?;
                SampleBuffer::from_scalars(meta.kind, meta.num_items, meta.num_resamples, &values)?
            }
            SensorKind::AirClimate => {
                let values = collect(meta, read_mask, Climate::default(), |id| self.air.sample(id))?;
                SampleBuffer::from_climate(meta.num_items, meta.num_resamples, &values)?
            }
        };
        Ok(buffer.with_read_mask(read_mask))
    }
}

/// Sample every masked ID `num_resamples` times, ID-major.
fn collect<T: Copy>(
    meta: &SensorMeta,
    read_mask: u16,
    unread: T,
    mut sample: impl FnMut(usize) -> Result<T>,
) -> Result<Vec<T, MAX_RAW_SAMPLES>> {
    let mut values = Vec::new();
    for id in 0..usize::from(meta.num_items) {
        let wanted = read_mask & (1 << id) != 0;
        for _ in 0..meta.num_resamples {
            let value = if wanted { sample(id)? } else { unread };
            values.push(value).map_err(|_| Error::OutOfMemory)?;
        }
    }
    Ok(values)
}

// ── ADC1 oneshot (ESP-IDF) ────────────────────────────────────

#[cfg(target_os = "espidf")]
mod adc {
    use esp_idf_svc::sys::*;
    use heapless::Vec;
    use log::{info, warn};

    use super::ScalarChannel;
    use crate::error::{Error, Result};
    use crate::events::MAX_SENSOR_ITEMS;

    /// The ADC1 oneshot unit.  Created once at boot and never deleted.
    #[derive(Clone, Copy)]
    pub struct Adc1 {
        handle: adc_oneshot_unit_handle_t,
    }

    impl Adc1 {
        /// Bring up ADC1 and configure `channels` at 12 dB / 12 bit.
        pub fn new(channels: &[u32]) -> core::result::Result<Self, i32> {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
            // SAFETY: called once from the boot path; `handle` outlives the call.
            let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
            if ret != ESP_OK as i32 {
                return Err(ret);
            }

            let chan_cfg = adc_oneshot_chan_cfg_t {
                atten: adc_atten_t_ADC_ATTEN_DB_12,
                bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
            };
            for &channel in channels {
                // SAFETY: `handle` was just created by adc_oneshot_new_unit.
                let ret = unsafe { adc_oneshot_config_channel(handle, channel, &chan_cfg) };
                if ret != ESP_OK as i32 {
                    return Err(ret);
                }
            }
            info!("adc: ADC1 configured, channels {:?}", channels);
            Ok(Self { handle })
        }

        /// Bank of channels read as IDs 0, 1, ...
        pub fn bank(self, channels: &[u32]) -> AdcBank {
            AdcBank {
                adc: self,
                channels: Vec::from_slice(&channels[..channels.len().min(MAX_SENSOR_ITEMS)]).unwrap_or_default(),
            }
        }

        fn read(&self, channel: u32) -> Result<u32> {
            let mut raw: i32 = 0;
            // SAFETY: the unit handle stays valid for the life of the firmware.
            let ret = unsafe { adc_oneshot_read(self.handle, channel, &mut raw) };
            if ret != ESP_OK as i32 {
                warn!("adc: channel {} read failed (rc={})", channel, ret);
                return Err(Error::SensorFail);
            }
            Ok(raw.max(0) as u32)
        }
    }

    pub struct AdcBank {
        adc: Adc1,
        channels: Vec<u32, MAX_SENSOR_ITEMS>,
    }

    // SAFETY: oneshot reads are only ever issued from the control task that
    // owns the banks; the raw unit handle is never freed.
    unsafe impl Send for AdcBank {}

    impl ScalarChannel for AdcBank {
        fn sample(&mut self, id: usize) -> Result<u32> {
            let channel = *self.channels.get(id).ok_or(Error::InvalidArgument)?;
            self.adc.read(channel)
        }
    }
}
