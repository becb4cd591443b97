// src/playlist.rs
// Playlist item/range specifications: parsing, membership, and the
// position-within-selection mapping used for "k of N" progress display.

/// One inclusive range; `end == None` means open-ended ("7-").
pub type PlaylistRange = (u64, Option<u64>);

/// Ordered list of ranges parsed from a user-typed spec. Immutable once
/// parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistRangeSet {
    ranges: Vec<PlaylistRange>,
}

impl PlaylistRangeSet {
    /// Parse a comma-separated spec of `N`, `A-B` or `A-` tokens. Malformed
    /// tokens (non-numeric, reversed, zero or negative indices) are silently
    /// discarded; the spec is user-typed free text.
    pub fn parse(spec: &str) -> Self {
        let mut ranges = Vec::new();
        for token in spec.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            if let Some((start_raw, end_raw)) = token.split_once('-') {
                let start = match start_raw.trim().parse::<u64>() {
                    Ok(n) if n > 0 => n,
                    _ => continue,
                };
                let end_raw = end_raw.trim();
                if end_raw.is_empty() {
                    ranges.push((start, None));
                    continue;
                }
                match end_raw.parse::<u64>() {
                    Ok(end) if end >= start => ranges.push((start, Some(end))),
                    _ => continue,
                }
            } else if let Ok(n) = token.parse::<u64>() {
                if n > 0 {
                    ranges.push((n, Some(n)));
                }
            }
        }
        Self { ranges }
    }

    pub fn ranges(&self) -> &[PlaylistRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of selected items, or None when any range is open-ended
    /// (or nothing parsed).
    pub fn total_count(&self) -> Option<u64> {
        if self.ranges.is_empty() {
            return None;
        }
        let mut total = 0;
        for (start, end) in &self.ranges {
            let end = (*end)?;
            total += end - start + 1;
        }
        Some(total)
    }

    /// 1-based position of an absolute playlist index within the selection,
    /// or None when no range contains it.
    pub fn position_of(&self, index: u64) -> Option<u64> {
        let mut preceding = 0;
        for (start, end) in &self.ranges {
            match end {
                Some(end) => {
                    if index >= *start && index <= *end {
                        return Some(preceding + (index - start) + 1);
                    }
                    preceding += end - start + 1;
                }
                None => {
                    if index >= *start {
                        return Some(preceding + (index - start) + 1);
                    }
                    // An open range swallows everything after it; nothing
                    // below start can match a later range either.
                    return None;
                }
            }
        }
        None
    }

    /// Membership check; used by the engine-side inclusion filter.
    pub fn contains(&self, index: u64) -> bool {
        self.ranges.iter().any(|(start, end)| match end {
            Some(end) => index >= *start && index <= *end,
            None => index >= *start,
        })
    }
}
