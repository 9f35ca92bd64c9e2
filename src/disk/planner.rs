//! Partition layout planning
//!
//! Pure sector arithmetic: given the disk size and the current root extent,
//! derive the three new extents (grown root, alternate root, data). No I/O
//! happens here; feasibility failures surface before anything touches the
//! disk.

use crate::error::{RepartError, Result};
use serde::{Deserialize, Serialize};

/// Extent alignment in sectors (1 MiB at 512-byte sectors)
pub const EXTENT_ALIGNMENT: u64 = 2048;

/// A contiguous run of sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionExtent {
    /// First sector of the extent
    pub start: u64,
    /// Length in sectors
    pub size: u64,
}

impl PartitionExtent {
    /// First sector past the extent
    pub fn end(&self) -> u64 {
        self.start + self.size
    }

    /// Whether two extents share any sector
    pub fn overlaps(&self, other: &PartitionExtent) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

/// The three extents of the new layout, in disk order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPlan {
    /// The root partition, grown in place to double its size
    pub resized_root: PartitionExtent,
    /// The equally sized alternate root, directly after the grown root
    pub second_root: PartitionExtent,
    /// Everything remaining to the end of the disk
    pub data: PartitionExtent,
}

impl LayoutPlan {
    /// The extents in disk order
    pub fn extents(&self) -> [PartitionExtent; 3] {
        [self.resized_root, self.second_root, self.data]
    }
}

fn align_up(value: u64, alignment: u64) -> Option<u64> {
    let rem = value % alignment;
    if rem == 0 {
        Some(value)
    } else {
        value.checked_add(alignment - rem)
    }
}

/// Derive the new layout from the current geometry
///
/// The root doubles in place (rounded up to a 1 MiB boundary), an alternate
/// root of the same size follows it, and the data extent takes the rest of
/// the disk. The remainder must be strictly positive.
pub fn plan_layout(total_sectors: u64, root_start: u64, root_size: u64) -> Result<LayoutPlan> {
    if root_size == 0 {
        return Err(RepartError::layout("root partition has zero size"));
    }
    if root_start
        .checked_add(root_size)
        .map_or(true, |end| end > total_sectors)
    {
        return Err(RepartError::layout(format!(
            "root extent ({} + {} sectors) extends past the disk end ({} sectors)",
            root_start, root_size, total_sectors
        )));
    }

    let new_root_size = root_size
        .checked_mul(2)
        .and_then(|doubled| align_up(doubled, EXTENT_ALIGNMENT))
        .ok_or_else(|| RepartError::layout("sector arithmetic overflow"))?;
    let combined_growth = new_root_size
        .checked_mul(2)
        .ok_or_else(|| RepartError::layout("sector arithmetic overflow"))?;

    let available = total_sectors.saturating_sub(root_start);
    if available <= combined_growth {
        return Err(RepartError::InsufficientSpace {
            needed_sectors: combined_growth,
            available_sectors: available,
        });
    }

    let resized_root = PartitionExtent {
        start: root_start,
        size: new_root_size,
    };
    let second_root = PartitionExtent {
        start: resized_root.end(),
        size: new_root_size,
    };
    let data = PartitionExtent {
        start: second_root.end(),
        size: total_sectors - second_root.end(),
    };

    let plan = LayoutPlan {
        resized_root,
        second_root,
        data,
    };
    sanity_check(&plan, total_sectors)?;
    Ok(plan)
}

/// Verify the plan's structural invariants
///
/// The planner always produces extents satisfying these conditions; the
/// check exists to catch arithmetic bugs before they reach the partition
/// table rather than to handle expected inputs.
fn sanity_check(plan: &LayoutPlan, total_sectors: u64) -> Result<()> {
    let extents = plan.extents();
    for (i, a) in extents.iter().enumerate() {
        if a.size == 0 {
            return Err(RepartError::layout("BUG: planner produced an empty extent"));
        }
        for b in extents.iter().skip(i + 1) {
            if a.overlaps(b) {
                return Err(RepartError::layout(
                    "BUG: planner produced overlapping extents",
                ));
            }
        }
    }
    if plan.second_root.start != plan.resized_root.end()
        || plan.data.start != plan.second_root.end()
    {
        return Err(RepartError::layout(
            "BUG: planner produced non-contiguous extents",
        ));
    }
    if plan.data.end() != total_sectors {
        return Err(RepartError::layout(
            "BUG: planned layout does not reach the disk end",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_aligned_input() {
        // 100 MiB root starting at sector 8192 on an 8 GiB disk
        let plan = plan_layout(16_777_216, 8192, 204_800).unwrap();
        assert_eq!(
            plan.resized_root,
            PartitionExtent {
                start: 8192,
                size: 409_600
            }
        );
        assert_eq!(plan.second_root.start, 417_792);
        assert_eq!(plan.second_root.size, 409_600);
        assert_eq!(plan.data.start, 827_392);
        assert_eq!(plan.data.end(), 16_777_216);
    }

    #[test]
    fn test_plan_rounds_odd_size_up() {
        let plan = plan_layout(16_777_216, 8192, 200_000).unwrap();
        // 400_000 rounded up to the next 2048 multiple
        assert_eq!(plan.resized_root.size, 401_408);
        assert_eq!(plan.second_root.size, 401_408);
    }

    #[test]
    fn test_plan_contiguity_and_overlap_freedom() {
        for (total, start, size) in [
            (1_000_000u64, 100_000u64, 100_000u64),
            (1_000_000, 100_000, 200_000),
            (62_333_952, 532_480, 3_072_000),
            (16_777_216, 2048, 1_000_001),
        ] {
            let plan = plan_layout(total, start, size).unwrap();
            assert_eq!(plan.second_root.start, plan.resized_root.end());
            assert_eq!(plan.data.start, plan.second_root.end());
            assert!(!plan.resized_root.overlaps(&plan.second_root));
            assert!(!plan.second_root.overlaps(&plan.data));
            assert!(!plan.resized_root.overlaps(&plan.data));
            assert_eq!(plan.data.end(), total);
        }
    }

    #[test]
    fn test_plan_insufficient_space() {
        // 4x the root size does not fit after the root start
        let err = plan_layout(900_000, 100_000, 200_000).unwrap_err();
        assert!(matches!(err, RepartError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_plan_exact_fit_rejected() {
        // Remainder of zero is not enough for a data partition
        let err = plan_layout(902_816, 100_000, 200_000).unwrap_err();
        assert!(matches!(err, RepartError::InsufficientSpace { .. }));
    }

    #[test]
    fn test_plan_zero_root_size_rejected() {
        assert!(plan_layout(1_000_000, 2048, 0).is_err());
    }

    #[test]
    fn test_plan_root_past_disk_end_rejected() {
        assert!(matches!(
            plan_layout(1_000_000, 900_000, 200_000),
            Err(RepartError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_extent_overlap() {
        let a = PartitionExtent {
            start: 0,
            size: 100,
        };
        let b = PartitionExtent {
            start: 100,
            size: 100,
        };
        let c = PartitionExtent { start: 99, size: 2 };
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(b.overlaps(&c));
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 2048), Some(0));
        assert_eq!(align_up(2048, 2048), Some(2048));
        assert_eq!(align_up(2049, 2048), Some(4096));
        assert_eq!(align_up(u64::MAX - 1, 2048), None);
    }
}
