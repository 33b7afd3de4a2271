//! Units of parallel work over the output matrix

use std::ops::Range;

use sparsemerge_core::{Error, Result};

use crate::utility::util::i64_to_usize;

/// One unit of work, fixed by the counting stage before the merge starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTask {
    /// Whole output vectors `kfirst..=klast`
    Coarse { kfirst: usize, klast: usize },
    /// A slice of the single output vector `k`.
    ///
    /// `a` and `b` are entry positions in A and B, `c` the output positions
    /// this task fills. `m` narrows the mask vector; `None` consults all of
    /// it.
    Fine {
        k: usize,
        a: Range<usize>,
        b: Range<usize>,
        m: Option<Range<usize>>,
        c: Range<usize>,
    },
}

impl AddTask {
    /// Output positions written by this task
    pub fn output_range(&self, cp: &[i64]) -> Result<Range<usize>> {
        let nvec = cp.len().saturating_sub(1);
        match self {
            Self::Coarse { kfirst, klast } => {
                if kfirst > klast || *klast >= nvec {
                    return Err(Error::contract(format!(
                        "coarse task {kfirst}..={klast} outside {nvec} output vectors"
                    )));
                }
                Ok(i64_to_usize(cp[*kfirst])..i64_to_usize(cp[*klast + 1]))
            }
            Self::Fine { k, c, .. } => {
                if *k >= nvec {
                    return Err(Error::contract(format!(
                        "fine task vector {k} outside {nvec} output vectors"
                    )));
                }
                let vector = i64_to_usize(cp[*k])..i64_to_usize(cp[*k + 1]);
                if c.start > c.end || c.start < vector.start || c.end > vector.end {
                    return Err(Error::contract(format!(
                        "fine task output {c:?} outside vector {k} at {vector:?}"
                    )));
                }
                Ok(c.clone())
            }
        }
    }
}

/// Output range of every task, checked to tile `0..cnz` in order.
///
/// The merge engine splits the output arenas along these ranges, so a
/// partition that overlaps or leaves a gap is rejected here.
pub fn partition_output(tasks: &[AddTask], cp: &[i64], cnz: usize) -> Result<Vec<Range<usize>>> {
    let mut ranges = Vec::with_capacity(tasks.len());
    let mut next = 0usize;
    for (tid, task) in tasks.iter().enumerate() {
        let range = task.output_range(cp)?;
        if range.start != next {
            return Err(Error::contract(format!(
                "task {tid} starts at output position {} but {next} was expected",
                range.start
            )));
        }
        next = range.end;
        ranges.push(range);
    }
    if next != cnz {
        return Err(Error::contract(format!(
            "tasks cover {next} of {cnz} output entries"
        )));
    }
    Ok(ranges)
}
