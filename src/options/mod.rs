// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Options controlling how spectra and averaged quantities are computed.
//!
//! An [AmpPhaseOptions] is tied to an IF configuration: window `i` of the
//! options corresponds to the window labelled `i` in a scan header. Slot 0 is
//! reserved; it holds no window configuration but acts as the template for
//! newly-installed windows. A request carries a list of options, one per IF
//! configuration seen in the data.

mod error;
mod modifier;

pub use error::OptionsError;
pub use modifier::{Modifier, XY_COLUMN};

use log::trace;

use crate::{
    constants::{DEFAULT_DELAY_AVERAGING, DEFAULT_REFERENCE_ANTENNA},
    data::ScanHeader,
};

/// Reduce with an arithmetic mean or a median.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
}

/// Average complex values (vector) or their amplitudes and phases
/// separately (scalar).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AverageKind {
    Vector,
    Scalar,
}

/// How channels are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AveragingMethod {
    pub statistic: Statistic,
    pub kind: AverageKind,
}

impl AveragingMethod {
    pub const MEAN: i32 = 1;
    pub const MEDIAN: i32 = 2;
    pub const VECTOR: i32 = 4;
    pub const SCALAR: i32 = 8;

    pub fn new(statistic: Statistic, kind: AverageKind) -> AveragingMethod {
        AveragingMethod { statistic, kind }
    }

    pub fn bits(self) -> i32 {
        let s = match self.statistic {
            Statistic::Mean => Self::MEAN,
            Statistic::Median => Self::MEDIAN,
        };
        let k = match self.kind {
            AverageKind::Vector => Self::VECTOR,
            AverageKind::Scalar => Self::SCALAR,
        };
        s | k
    }

    pub fn from_bits(bits: i32) -> Result<AveragingMethod, OptionsError> {
        let statistic = match (bits & Self::MEAN != 0, bits & Self::MEDIAN != 0) {
            (true, false) => Statistic::Mean,
            (false, true) => Statistic::Median,
            _ => return Err(OptionsError::BadAveragingBits(bits)),
        };
        let kind = match (bits & Self::VECTOR != 0, bits & Self::SCALAR != 0) {
            (true, false) => AverageKind::Vector,
            (false, true) => AverageKind::Scalar,
            _ => return Err(OptionsError::BadAveragingBits(bits)),
        };
        Ok(AveragingMethod { statistic, kind })
    }
}

impl Default for AveragingMethod {
    /// MEAN | VECTOR
    fn default() -> Self {
        AveragingMethod::new(Statistic::Mean, AverageKind::Vector)
    }
}

/// A channel range used for averaging and system-temperature estimation. The
/// minimum is included and the maximum excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TvChannels {
    pub min: usize,
    pub max: usize,
}

impl TvChannels {
    /// Make a range; the bounds are put in order.
    pub fn new(a: usize, b: usize) -> TvChannels {
        TvChannels {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// The range clipped to a number of channels.
    pub fn clamp(self, num_channels: usize) -> std::ops::Range<usize> {
        self.min.min(num_channels)..self.max.min(num_channels)
    }
}

/// The default tvchannel range for a window with `num_channels` channels of
/// width `chan_width_mhz`, centred on `centre_freq_mhz`.
pub fn default_tvchannels(
    num_channels: usize,
    chan_width_mhz: f64,
    centre_freq_mhz: f64,
) -> TvChannels {
    if num_channels <= 33 {
        TvChannels::new(9, 17)
    } else if chan_width_mhz < 1.0 {
        TvChannels::new(256, 1792)
    } else if centre_freq_mhz == 2100.0 {
        TvChannels::new(200, 900)
    } else {
        TvChannels::new(513, 1537)
    }
}

/// Settings for a single window.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowOptions {
    /// \[MHz\]
    pub centre_freq_mhz: f64,
    /// \[MHz\]
    pub bandwidth_mhz: f64,
    pub num_channels: usize,
    pub tvchannels: Option<TvChannels>,
    /// The channel group size for delay fitting; 0 when unset.
    pub delay_averaging: usize,
    pub averaging: Option<AveragingMethod>,
    pub modifiers: Vec<Modifier>,
}

impl WindowOptions {
    /// The delay-averaging factor, falling back to the default when unset.
    pub fn effective_delay_averaging(&self) -> usize {
        if self.delay_averaging == 0 {
            DEFAULT_DELAY_AVERAGING
        } else {
            self.delay_averaging
        }
    }

    pub fn effective_averaging(&self) -> AveragingMethod {
        self.averaging.unwrap_or_default()
    }

    /// The comparison tuple used for options equality.
    fn key(&self) -> (Option<TvChannels>, usize, Option<AveragingMethod>, usize) {
        (
            self.tvchannels,
            self.delay_averaging,
            self.averaging,
            self.modifiers.len(),
        )
    }
}

/// Which modifiers to remove.
#[derive(Debug, Clone, PartialEq)]
pub enum ModifierSelection {
    All,
    /// Sorted indices.
    Indices(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmpPhaseOptions {
    pub phase_in_degrees: bool,
    pub include_flagged_data: bool,
    /// Per-window settings; slot 0 is reserved.
    pub windows: Vec<WindowOptions>,
    pub systemp_reverse_online: bool,
    pub systemp_apply_computed: bool,
    pub reference_antenna: usize,
}

impl Default for AmpPhaseOptions {
    fn default() -> Self {
        AmpPhaseOptions {
            phase_in_degrees: true,
            include_flagged_data: false,
            windows: vec![WindowOptions::default()],
            systemp_reverse_online: false,
            systemp_apply_computed: false,
            reference_antenna: DEFAULT_REFERENCE_ANTENNA,
        }
    }
}

impl AmpPhaseOptions {
    /// Create options for a scan's IF configuration, taking the scalar
    /// settings and window template from `template`. Every window gets its
    /// default tvchannels.
    pub fn for_header(template: &AmpPhaseOptions, header: &ScanHeader) -> AmpPhaseOptions {
        let slot0 = template.windows.first().cloned().unwrap_or_default();
        let mut windows = vec![WindowOptions {
            modifiers: vec![],
            ..slot0.clone()
        }];
        for window in &header.windows {
            windows.push(WindowOptions {
                centre_freq_mhz: window.centre_freq_mhz,
                bandwidth_mhz: window.bandwidth_mhz,
                num_channels: window.num_channels,
                tvchannels: Some(default_tvchannels(
                    window.num_channels,
                    window.channel_width_mhz(),
                    window.centre_freq_mhz,
                )),
                delay_averaging: slot0.effective_delay_averaging(),
                averaging: Some(slot0.effective_averaging()),
                modifiers: vec![],
            });
        }
        AmpPhaseOptions {
            windows,
            ..template.clone()
        }
    }

    /// The number of configured windows (excluding the reserved slot).
    pub fn num_windows(&self) -> usize {
        self.windows.len().saturating_sub(1)
    }

    /// The settings of a window, by label.
    pub fn window(&self, label: usize) -> Option<&WindowOptions> {
        if label == 0 {
            return None;
        }
        self.windows.get(label)
    }

    pub fn window_mut(&mut self, label: usize) -> Option<&mut WindowOptions> {
        if label == 0 {
            return None;
        }
        self.windows.get_mut(label)
    }

    /// Do these options describe the same IF configuration as the header?
    pub fn matches_header(&self, header: &ScanHeader) -> bool {
        self.num_windows() == header.windows.len()
            && header.windows.iter().all(|w| {
                self.window(w.label).map_or(false, |o| {
                    w.same_configuration(o.centre_freq_mhz, o.bandwidth_mhz, o.num_channels)
                })
            })
    }

    /// Field-wise equality: scalar flags, per-window tvchannels, delay
    /// averaging, averaging method and modifier lists.
    pub fn matches(&self, other: &AmpPhaseOptions) -> bool {
        self.phase_in_degrees == other.phase_in_degrees
            && self.include_flagged_data == other.include_flagged_data
            && self.systemp_reverse_online == other.systemp_reverse_online
            && self.systemp_apply_computed == other.systemp_apply_computed
            && self.reference_antenna == other.reference_antenna
            && self.windows.len() == other.windows.len()
            && self
                .windows
                .iter()
                .zip(other.windows.iter())
                .all(|(a, b)| a.key() == b.key() && a.modifiers == b.modifiers)
    }

    /// Install a tvchannel range for a window, growing the window list if
    /// required. New slots are unset, except the one being installed, which
    /// takes its delay averaging and averaging method from slot 0 if set there.
    pub fn add_tvchannels(&mut self, window: usize, min: usize, max: usize) -> Result<(), OptionsError> {
        if window == 0 {
            return Err(OptionsError::ReservedWindow);
        }
        if self.windows.is_empty() {
            self.windows.push(WindowOptions::default());
        }
        let installing_new = window >= self.windows.len();
        while self.windows.len() <= window {
            self.windows.push(WindowOptions::default());
        }

        let slot0 = &self.windows[0];
        let delay_averaging = slot0.effective_delay_averaging();
        let averaging = slot0.effective_averaging();
        let w = &mut self.windows[window];
        w.tvchannels = Some(TvChannels::new(min, max));
        if installing_new || w.delay_averaging == 0 {
            w.delay_averaging = delay_averaging;
        }
        if installing_new || w.averaging.is_none() {
            w.averaging = Some(averaging);
        }
        trace!("Window {window} tvchannels set to [{min}, {max})");
        Ok(())
    }

    /// The tvchannels of a window, installing the defaults for the header's
    /// window if none are set.
    pub fn tvchannels_or_default(
        &mut self,
        header: &ScanHeader,
        label: usize,
    ) -> Result<TvChannels, OptionsError> {
        if let Some(tv) = self.window(label).and_then(|w| w.tvchannels) {
            return Ok(tv);
        }
        let w = header.window(label).ok_or(OptionsError::UnknownWindow {
            window: label,
            num_windows: header.windows.len(),
        })?;
        let tv = default_tvchannels(w.num_channels, w.channel_width_mhz(), w.centre_freq_mhz);
        self.add_tvchannels(label, tv.min, tv.max)?;
        Ok(tv)
    }

    /// Install a modifier on a window, returning the installed slot.
    pub fn add_modifier(
        &mut self,
        window: usize,
        modifier: Modifier,
    ) -> Result<&mut Modifier, OptionsError> {
        let num_windows = self.num_windows();
        let w = self
            .window_mut(window)
            .ok_or(OptionsError::UnknownWindow {
                window,
                num_windows,
            })?;
        w.modifiers.push(modifier);
        let last = w.modifiers.len() - 1;
        Ok(&mut w.modifiers[last])
    }

    /// Remove modifiers from a window. Indices must be sorted; out-of-range
    /// indices are an error and nothing is removed.
    pub fn remove_modifiers(
        &mut self,
        window: usize,
        selection: ModifierSelection,
    ) -> Result<(), OptionsError> {
        let num_windows = self.num_windows();
        let w = self
            .window_mut(window)
            .ok_or(OptionsError::UnknownWindow {
                window,
                num_windows,
            })?;
        match selection {
            ModifierSelection::All => w.modifiers.clear(),
            ModifierSelection::Indices(indices) => {
                let len = w.modifiers.len();
                if let Some(&index) = indices.iter().find(|&&i| i >= len) {
                    return Err(OptionsError::ModifierIndex { window, index, len });
                }
                // Remove from the back so earlier indices stay valid.
                for &index in indices.iter().rev() {
                    w.modifiers.remove(index);
                }
            }
        }
        Ok(())
    }

    /// The modifiers of a window that are active at `mjd`.
    pub fn active_modifiers(&self, window: usize, mjd: f64) -> impl Iterator<Item = &Modifier> {
        self.window(window)
            .map(|w| w.modifiers.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter(move |m| m.is_active(mjd))
    }
}

/// Two lists of options match when they have the same length and each element
/// matches its counterpart.
pub fn options_lists_match(a: &[AmpPhaseOptions], b: &[AmpPhaseOptions]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.matches(y))
}

/// Find the options in `list` for the header's IF configuration, creating them
/// (from the first element's settings, or the defaults) if there are none.
pub fn find_or_create_options<'a>(
    list: &'a mut Vec<AmpPhaseOptions>,
    header: &ScanHeader,
) -> &'a mut AmpPhaseOptions {
    match list.iter().position(|o| o.matches_header(header)) {
        Some(i) => &mut list[i],
        None => {
            let template = list.first().cloned().unwrap_or_default();
            trace!(
                "Creating options for a new IF configuration with {} windows",
                header.windows.len()
            );
            list.push(AmpPhaseOptions::for_header(&template, header));
            let last = list.len() - 1;
            &mut list[last]
        }
    }
}

/// Merge `update` into `base`: entries of `base` with the same IF
/// configuration as an entry of `update` are replaced by it; the remaining
/// entries of `update` are appended.
pub fn combine_options(base: &mut Vec<AmpPhaseOptions>, update: &[AmpPhaseOptions]) {
    for new in update {
        let same_config = base.iter().position(|old| same_configuration(old, new));
        match same_config {
            Some(i) => base[i] = new.clone(),
            None => base.push(new.clone()),
        }
    }
}

fn same_configuration(a: &AmpPhaseOptions, b: &AmpPhaseOptions) -> bool {
    a.num_windows() == b.num_windows()
        && a.windows.iter().zip(b.windows.iter()).skip(1).all(|(x, y)| {
            x.centre_freq_mhz == y.centre_freq_mhz
                && x.bandwidth_mhz == y.bandwidth_mhz
                && x.num_channels == y.num_channels
        })
}
