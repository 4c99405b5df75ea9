//! Triangle index functor
//!
//! Expands a geometry's primitive sets into triangles. Line and point
//! topologies produce nothing.

use super::primitive::{PrimitiveMode, PrimitiveSet};

/// Call `f` with the three vertex indices of every triangle
///
/// Primitive sets are visited in order, then triangles in draw order.
/// Strips alternate winding so every triangle keeps the front face of the
/// first one.
pub fn for_each_triangle(primitive_sets: &[PrimitiveSet], mut f: impl FnMut(u32, u32, u32)) {
    for primitive in primitive_sets {
        match primitive {
            PrimitiveSet::DrawArrays { mode, first, count } => {
                if *count > 0 && first.checked_add(count - 1).is_none() {
                    log::error!("Skipping primitive set with {} vertices starting at {}", count, first);
                    continue;
                }
                draw_arrays(*mode, *first, *count, &mut f);
            }
            PrimitiveSet::DrawElements {
                mode,
                indices,
                offset,
                count,
            } => {
                let end = offset.saturating_add(*count);
                debug_assert!(
                    end <= indices.len(),
                    "index range {}..{} exceeds {} indices",
                    offset,
                    end,
                    indices.len()
                );
                if end > indices.len() {
                    log::error!("Skipping primitive set with out of range indices");
                    continue;
                }
                draw_elements(*mode, &indices[*offset..end], &mut f);
            }
        }
    }
}

/// Collect every triangle of the primitive sets
pub fn collect_triangles(primitive_sets: &[PrimitiveSet]) -> Vec<[u32; 3]> {
    let mut triangles = Vec::new();
    for_each_triangle(primitive_sets, |a, b, c| triangles.push([a, b, c]));
    triangles
}

/// Every index in `first..first + count` must fit in a `u32`
fn draw_arrays(mode: PrimitiveMode, first: u32, count: u32, f: &mut impl FnMut(u32, u32, u32)) {
    match mode {
        PrimitiveMode::Triangles => {
            for triangle in 0..count / 3 {
                let pos = first + triangle * 3;
                f(pos, pos + 1, pos + 2);
            }
        }
        PrimitiveMode::TriangleStrip => {
            for i in 2..count {
                let pos = first + i - 2;
                if i % 2 == 1 {
                    f(pos, pos + 2, pos + 1);
                } else {
                    f(pos, pos + 1, pos + 2);
                }
            }
        }
        PrimitiveMode::TriangleFan => {
            for i in 2..count {
                let pos = first + i - 1;
                f(first, pos, pos + 1);
            }
        }
        _ => {}
    }
}

fn draw_elements(mode: PrimitiveMode, indices: &[u32], f: &mut impl FnMut(u32, u32, u32)) {
    match mode {
        PrimitiveMode::Triangles => {
            for triangle in indices.chunks_exact(3) {
                f(triangle[0], triangle[1], triangle[2]);
            }
        }
        PrimitiveMode::TriangleStrip => {
            for (i, window) in indices.windows(3).enumerate() {
                if i % 2 == 1 {
                    f(window[0], window[2], window[1]);
                } else {
                    f(window[0], window[1], window[2]);
                }
            }
        }
        PrimitiveMode::TriangleFan => {
            if let Some((&pivot, rest)) = indices.split_first() {
                for pair in rest.windows(2) {
                    f(pivot, pair[0], pair[1]);
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_fan() {
        let sets = [PrimitiveSet::draw_elements(
            PrimitiveMode::TriangleFan,
            vec![10, 11, 12, 13, 14],
        )];
        assert_eq!(
            collect_triangles(&sets),
            vec![[10, 11, 12], [10, 12, 13], [10, 13, 14]]
        );
    }

    #[test]
    fn test_indexed_strip_alternates_winding() {
        let sets = [PrimitiveSet::draw_elements(
            PrimitiveMode::TriangleStrip,
            vec![0, 1, 2, 3, 4],
        )];
        assert_eq!(collect_triangles(&sets), vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]]);
    }

    #[test]
    fn test_indexed_triangles_with_offset() {
        let sets = [PrimitiveSet::draw_elements_range(
            PrimitiveMode::Triangles,
            vec![9, 9, 0, 1, 2, 3, 4, 5, 7],
            2,
            6,
        )];
        assert_eq!(collect_triangles(&sets), vec![[0, 1, 2], [3, 4, 5]]);
    }

    #[test]
    fn test_array_topologies() {
        let triangles = [PrimitiveSet::draw_arrays(PrimitiveMode::Triangles, 3, 7)];
        assert_eq!(collect_triangles(&triangles), vec![[3, 4, 5], [6, 7, 8]]);

        let strip = [PrimitiveSet::draw_arrays(PrimitiveMode::TriangleStrip, 0, 4)];
        assert_eq!(collect_triangles(&strip), vec![[0, 1, 2], [1, 3, 2]]);

        let fan = [PrimitiveSet::draw_arrays(PrimitiveMode::TriangleFan, 5, 4)];
        assert_eq!(collect_triangles(&fan), vec![[5, 6, 7], [5, 7, 8]]);
    }

    #[test]
    fn test_unsupported_modes_are_skipped() {
        let sets = [
            PrimitiveSet::draw_arrays(PrimitiveMode::Lines, 0, 6),
            PrimitiveSet::draw_elements(PrimitiveMode::Points, vec![0, 1, 2]),
            PrimitiveSet::draw_arrays(PrimitiveMode::Triangles, 0, 3),
        ];
        assert_eq!(collect_triangles(&sets), vec![[0, 1, 2]]);
    }

    #[test]
    fn test_degenerate_counts_emit_nothing() {
        let sets = [
            PrimitiveSet::draw_arrays(PrimitiveMode::TriangleStrip, 0, 2),
            PrimitiveSet::draw_elements(PrimitiveMode::TriangleFan, vec![]),
        ];
        assert!(collect_triangles(&sets).is_empty());
    }

    #[test]
    fn test_arrays_past_index_range_are_skipped() {
        let sets = [
            PrimitiveSet::draw_arrays(PrimitiveMode::TriangleStrip, u32::MAX - 2, 5),
            PrimitiveSet::draw_arrays(PrimitiveMode::TriangleFan, u32::MAX, 3),
            PrimitiveSet::draw_arrays(PrimitiveMode::Triangles, u32::MAX - 1, 3),
        ];
        assert!(collect_triangles(&sets).is_empty());
    }

    #[test]
    fn test_arrays_ending_at_last_index() {
        let triangles = [PrimitiveSet::draw_arrays(PrimitiveMode::Triangles, u32::MAX - 2, 3)];
        assert_eq!(collect_triangles(&triangles), vec![[u32::MAX - 2, u32::MAX - 1, u32::MAX]]);

        let sets = [PrimitiveSet::draw_arrays(PrimitiveMode::TriangleFan, u32::MAX - 3, 4)];
        assert_eq!(
            collect_triangles(&sets),
            vec![[u32::MAX - 3, u32::MAX - 2, u32::MAX - 1], [u32::MAX - 3, u32::MAX - 1, u32::MAX]]
        );
    }
}
