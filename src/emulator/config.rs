use std::num::NonZeroU32;
use std::time::Duration;
use structopt::StructOpt;

/// Toggles for instructions whose behaviour differs between CHIP-8 implementations.
/// Any combination is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6 and 8XYE copy VY into VX before shifting.
    pub shift_vx_is_vy: bool,
    /// BNNN jumps to NNN + V0 rather than NNN + VX.
    pub jump_with_offset_legacy: bool,
    /// FX55 and FX65 increment I before every byte they move.
    pub store_increment_ir: bool,
    /// DXYN wraps sprites around the screen edges instead of clipping them.
    pub draw_sprite_wrap: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks {
            shift_vx_is_vy: false,
            jump_with_offset_legacy: false,
            store_increment_ir: false,
            draw_sprite_wrap: true,
        }
    }
}

/// How fast the emulator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speed {
    /// Instructions executed per batch.
    pub batch_size: usize,
    /// Batches per second.
    pub batch_rate: NonZeroU32,
    /// Delay and sound timer decrements per second.
    pub timer_rate: NonZeroU32,
}

impl Speed {
    pub fn batch_period(&self) -> Duration {
        period(self.batch_rate)
    }

    pub fn timer_period(&self) -> Duration {
        period(self.timer_rate)
    }
}

/// One second divided by `rate`, never shorter than a nanosecond.
fn period(rate: NonZeroU32) -> Duration {
    (Duration::from_secs(1) / rate.get()).max(Duration::from_nanos(1))
}

impl Default for Speed {
    fn default() -> Self {
        // 10 instructions every 20ms, timers at 60 Hz
        Speed {
            batch_size: 10,
            batch_rate: NonZeroU32::new(50).unwrap_or(NonZeroU32::MIN),
            timer_rate: NonZeroU32::new(60).unwrap_or(NonZeroU32::MIN),
        }
    }
}

/// Emulator options shared by every frontend.
#[derive(StructOpt, Debug, Clone)]
pub struct ConfigOpt {
    /// Shift instructions copy VY into VX first
    #[structopt(long)]
    pub shift_vx_is_vy: bool,

    /// BNNN jumps to NNN + V0
    #[structopt(long)]
    pub jump_with_offset_legacy: bool,

    /// FX55/FX65 increment I before every byte
    #[structopt(long)]
    pub store_increment_ir: bool,

    /// Clip sprites at the screen edges instead of wrapping them
    #[structopt(long)]
    pub no_sprite_wrap: bool,

    /// Instructions executed per batch
    #[structopt(long, default_value = "10")]
    pub batch_size: usize,

    /// Batches per second
    #[structopt(long, default_value = "50")]
    pub batch_rate: NonZeroU32,

    /// Timer decrements per second
    #[structopt(long, default_value = "60")]
    pub timer_rate: NonZeroU32,
}

impl ConfigOpt {
    pub fn quirks(&self) -> Quirks {
        Quirks {
            shift_vx_is_vy: self.shift_vx_is_vy,
            jump_with_offset_legacy: self.jump_with_offset_legacy,
            store_increment_ir: self.store_increment_ir,
            draw_sprite_wrap: !self.no_sprite_wrap,
        }
    }

    pub fn speed(&self) -> Speed {
        Speed {
            batch_size: self.batch_size,
            batch_rate: self.batch_rate,
            timer_rate: self.timer_rate,
        }
    }
}
