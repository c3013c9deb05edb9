//! Weather-dependent display theme.
//!
//! Pure mapping from a WMO condition code plus a day/night flag to a set
//! of display colors. Day/night only distinguishes the clear and cloudy
//! variants; every other condition looks the same around the clock.

/// A set of display colors derived from the current weather.
/// Never mutated in place - recomputed on every snapshot update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: &'static str,
    pub text_color: &'static str,
    pub glass_color: &'static str,
    pub border_color: &'static str,
}

pub const CLEAR_DAY: Theme = Theme {
    background: "linear-gradient(135deg, #2980B9 0%, #6DD5FA 100%)",
    text_color: "#1a1a1a",
    glass_color: "rgba(255, 255, 255, 0.25)",
    border_color: "rgba(255, 255, 255, 0.4)",
};

pub const CLEAR_NIGHT: Theme = Theme {
    background: "linear-gradient(135deg, #141E30 0%, #243B55 100%)",
    text_color: "#ffffff",
    glass_color: "rgba(0, 0, 0, 0.35)",
    border_color: "rgba(255, 255, 255, 0.15)",
};

pub const CLOUDY_DAY: Theme = Theme {
    background: "linear-gradient(135deg, #606c88 0%, #3f4c6b 100%)",
    text_color: "#ffffff",
    glass_color: "rgba(0, 0, 0, 0.2)",
    border_color: "rgba(255, 255, 255, 0.2)",
};

pub const CLOUDY_NIGHT: Theme = Theme {
    background: "linear-gradient(135deg, #232526 0%, #414345 100%)",
    text_color: "#e0e0e0",
    glass_color: "rgba(0, 0, 0, 0.4)",
    border_color: "rgba(255, 255, 255, 0.1)",
};

pub const RAIN: Theme = Theme {
    background: "linear-gradient(135deg, #203A43 0%, #2C5364 100%)",
    text_color: "#ffffff",
    glass_color: "rgba(0, 0, 0, 0.4)",
    border_color: "rgba(255, 255, 255, 0.1)",
};

pub const SNOW: Theme = Theme {
    background: "linear-gradient(135deg, #83a4d4 0%, #b6fbff 100%)",
    text_color: "#1a1a1a",
    glass_color: "rgba(255, 255, 255, 0.3)",
    border_color: "rgba(255, 255, 255, 0.4)",
};

pub const THUNDER: Theme = Theme {
    background: "linear-gradient(135deg, #2c3e50 0%, #bdc3c7 100%)",
    text_color: "#ffffff",
    glass_color: "rgba(0, 0, 0, 0.4)",
    border_color: "rgba(255, 255, 255, 0.15)",
};

pub const FOG: Theme = Theme {
    background: "linear-gradient(135deg, #525252 0%, #3d72b4 100%)",
    text_color: "#ffffff",
    glass_color: "rgba(0, 0, 0, 0.3)",
    border_color: "rgba(255, 255, 255, 0.2)",
};

/// Select the display theme for a WMO condition code.
///
/// Total and deterministic: `None` and unmapped codes fall through to the
/// clear-day default, showers (80-82) render as rain.
pub fn select_theme(condition_code: Option<i32>, is_day: bool) -> Theme {
    let code = match condition_code {
        Some(c) => c,
        None => return CLEAR_DAY,
    };

    match code {
        0 => {
            if is_day {
                CLEAR_DAY
            } else {
                CLEAR_NIGHT
            }
        }
        1..=3 => {
            if is_day {
                CLOUDY_DAY
            } else {
                CLOUDY_NIGHT
            }
        }
        45..=48 => FOG,
        51..=67 => RAIN,
        71..=77 => SNOW,
        80..=82 => RAIN,
        c if c >= 95 => THUNDER,
        _ => CLEAR_DAY,
    }
}
