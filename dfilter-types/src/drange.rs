use std::fmt;

use itertools::Itertools;

/// One node of a byte range.
///
/// Offsets may be negative, meaning "from the end of the data"; resolution
/// against a concrete length happens at slice time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DRangeNode {
    /// `start:length`
    Length { start: i64, length: i64 },
    /// `start-end`, both ends inclusive
    Range { start: i64, end: i64 },
    /// `start:`, everything from start on
    ToEnd { start: i64 },
}

/// An ordered list of byte-range nodes, as written inside `[...]`.
///
/// Slicing concatenates the bytes selected by each node in order. Nodes that
/// fall outside the data select nothing; a node whose start lies past its end
/// selects nothing as well.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DRange {
    nodes: Vec<DRangeNode>,
}

impl DRange {
    pub fn new(nodes: Vec<DRangeNode>) -> Self {
        DRange { nodes }
    }

    /// The implicit `0:` range used to view a whole value as bytes.
    pub fn to_the_end() -> Self {
        DRange { nodes: vec![DRangeNode::ToEnd { start: 0 }] }
    }

    pub fn nodes(&self) -> &[DRangeNode] {
        &self.nodes
    }

    /// Select the bytes this range denotes out of `data`.
    pub fn select(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for node in &self.nodes {
            match *node {
                DRangeNode::Length { start, length } => {
                    if length > 0 {
                        if let Some(s) = resolve_offset(start, data.len()) {
                            let e = (s + length as usize).min(data.len());
                            out.extend_from_slice(&data[s..e]);
                        }
                    }
                }
                DRangeNode::Range { start, end } => {
                    if let (Some(s), Some(e)) =
                        (resolve_offset(start, data.len()), resolve_end(end, data.len()))
                    {
                        if e >= s {
                            out.extend_from_slice(&data[s..=e]);
                        }
                    }
                }
                DRangeNode::ToEnd { start } => {
                    if let Some(s) = resolve_offset(start, data.len()) {
                        out.extend_from_slice(&data[s..]);
                    }
                }
            }
        }
        out
    }
}

/// Resolve a possibly negative offset against the data length. Returns `None`
/// when the offset lies entirely outside the data.
fn resolve_offset(offset: i64, len: usize) -> Option<usize> {
    if offset >= 0 {
        let offset = offset as usize;
        (offset < len).then_some(offset)
    } else {
        len.checked_sub(offset.unsigned_abs() as usize)
    }
}

/// End offsets clamp to the last byte instead of falling off the data.
fn resolve_end(end: i64, len: usize) -> Option<usize> {
    if end >= 0 {
        Some((end as usize).min(len.checked_sub(1)?))
    } else {
        len.checked_sub(end.unsigned_abs() as usize)
    }
}

impl fmt::Display for DRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            self.nodes
                .iter()
                .map(|node| match *node {
                    DRangeNode::Length { start, length } => format!("{start}:{length}"),
                    DRangeNode::Range { start, end } => format!("{start}-{end}"),
                    DRangeNode::ToEnd { start } => format!("{start}:"),
                })
                .join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_every_node_form() {
        let range = DRange::new(vec![
            DRangeNode::Length { start: 0, length: 2 },
            DRangeNode::Range { start: 3, end: 4 },
            DRangeNode::ToEnd { start: 5 },
        ]);
        assert_eq!(range.to_string(), "0:2,3-4,5:");
    }

    #[test]
    fn selects_and_concatenates() {
        let data = [0u8, 1, 2, 3, 4, 5];
        let range = DRange::new(vec![
            DRangeNode::Length { start: 0, length: 2 },
            DRangeNode::Range { start: 4, end: 5 },
        ]);
        assert_eq!(range.select(&data), vec![0, 1, 4, 5]);
    }

    #[test]
    fn negative_offsets_count_from_the_end() {
        let data = [0u8, 1, 2, 3];
        let range = DRange::new(vec![DRangeNode::Length { start: -2, length: 2 }]);
        assert_eq!(range.select(&data), vec![2, 3]);
        let tail = DRange::new(vec![DRangeNode::ToEnd { start: -1 }]);
        assert_eq!(tail.select(&data), vec![3]);
    }

    #[test]
    fn out_of_bounds_selects_nothing() {
        let data = [0u8, 1];
        assert_eq!(DRange::new(vec![DRangeNode::Length { start: 5, length: 2 }]).select(&data), Vec::<u8>::new());
        assert_eq!(DRange::new(vec![DRangeNode::Range { start: 1, end: 0 }]).select(&data), Vec::<u8>::new());
        assert_eq!(DRange::new(vec![DRangeNode::Length { start: -9, length: 1 }]).select(&data), Vec::<u8>::new());
    }

    #[test]
    fn length_forms_clamp_to_the_data() {
        let data = [9u8, 8, 7];
        assert_eq!(DRange::new(vec![DRangeNode::Length { start: 1, length: 10 }]).select(&data), vec![8, 7]);
        assert_eq!(DRange::new(vec![DRangeNode::Range { start: 1, end: 9 }]).select(&data), vec![8, 7]);
    }

    #[test]
    fn whole_value_range() {
        let data = [1u8, 2, 3];
        assert_eq!(DRange::to_the_end().select(&data), data.to_vec());
        assert_eq!(DRange::to_the_end().to_string(), "0:");
    }
}
