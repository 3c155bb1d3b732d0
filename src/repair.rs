//! Repair of ICE credentials damaged in transit.
//!
//! Some room servers deliver queued offers and candidates with every `+` of
//! the ICE ufrag/pwd tokens turned into a space. Both functions here put the
//! `+` back in exactly the affected places and leave all other bytes alone.

/// Lines carrying one of these markers hold ICE credentials.
const SDP_CREDENTIAL_MARKERS: [&str; 2] = ["ufrag", "ice-pwd"];

/// Marker preceding the username fragment inside a candidate line.
const CANDIDATE_MARKER: &str = "frag";

/// The `g` of the marker only counts from this character index on.
const CANDIDATE_MARKER_MIN_INDEX: usize = 4;

/// Number of characters after the separator that may contain damage.
const CANDIDATE_REPAIR_WINDOW: usize = 4;

/// Restore `+` in the `a=ice-ufrag` / `a=ice-pwd` lines of an SDP body.
///
/// Lines are split on `\n` and joined back with `\n`, so line count, order
/// and any trailing delimiter are preserved.
pub fn repair_offer_sdp(sdp: &str) -> String {
    sdp.split('\n')
        .map(|line| {
            if SDP_CREDENTIAL_MARKERS.iter().any(|marker| line.contains(marker)) {
                line.replace(' ', "+")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    /// Looking for the end of the first `frag`.
    Scanning,
    /// Just past `frag`; the next character is the field separator.
    Matched,
    /// Inside the damaged window, `n` characters consumed so far.
    Repairing(usize),
    Done,
}

/// Restore `+` in the ufrag token of a candidate line.
///
/// Only the first `frag` counts, and only when its `g` sits at character
/// index 4 or later. The character right after it is copied as-is, then
/// spaces in the following four characters become `+`.
pub fn repair_candidate_line(candidate: &str) -> String {
    let mut out = String::with_capacity(candidate.len());
    let mut state = WindowState::Scanning;

    for (index, c) in candidate.chars().enumerate() {
        state = match state {
            WindowState::Scanning => {
                // Output still mirrors the input here, so it doubles as lookback.
                let matched = index >= CANDIDATE_MARKER_MIN_INDEX
                    && c == 'g'
                    && out.ends_with(&CANDIDATE_MARKER[..3]);
                out.push(c);
                if matched {
                    WindowState::Matched
                } else {
                    WindowState::Scanning
                }
            }
            WindowState::Matched => {
                out.push(c);
                WindowState::Repairing(0)
            }
            WindowState::Repairing(seen) => {
                out.push(if c == ' ' { '+' } else { c });
                if seen + 1 == CANDIDATE_REPAIR_WINDOW {
                    WindowState::Done
                } else {
                    WindowState::Repairing(seen + 1)
                }
            }
            WindowState::Done => {
                out.push(c);
                WindowState::Done
            }
        };
    }

    out
}
