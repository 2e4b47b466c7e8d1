//! Time aligner (C3): maps each LTF bar to the most recent *closed* HTF
//! feature record, with no lookahead.

use crate::bar::Bar;
use crate::error::CoreError;
use crate::features::HtfFeatures;

/// Align a sequence of LTF bars against HTF bars + their feature records.
///
/// For each LTF bar, returns the `HtfFeatures` of the most recent HTF bar
/// whose `close_time <= ltf.open_time`. Bars before any such HTF bar exists
/// get `HtfFeatures::undefined()`. `htf_bars` and `htf_features` must be the
/// same length and already sorted ascending by `open_time`; the aligner does
/// not assume any fixed ratio between the two timeframes.
pub fn align(ltf_bars: &[Bar], htf_bars: &[Bar], htf_features: &[HtfFeatures]) -> Result<Vec<HtfFeatures>, CoreError> {
    if htf_bars.len() != htf_features.len() {
        return Err(CoreError::Alignment {
            htf_bars: htf_bars.len(),
            htf_features: htf_features.len(),
        });
    }

    let mut out = Vec::with_capacity(ltf_bars.len());
    let mut htf_cursor = 0usize;

    for ltf_bar in ltf_bars {
        while htf_cursor < htf_bars.len() && htf_bars[htf_cursor].close_time <= ltf_bar.open_time {
            htf_cursor += 1;
        }
        out.push(if htf_cursor == 0 {
            HtfFeatures::undefined()
        } else {
            htf_features[htf_cursor - 1]
        });
    }

    Ok(out)
}
