//! Function tables: a vector of optional function indices used by `call_indirect`.

use super::RuntimeError;
use crate::parser::module::Limits;

#[derive(Debug)]
pub struct Table {
    /// `None` marks a slot with no function.
    elements: Vec<Option<u32>>,
    limits: Limits,
}

impl Table {
    /// Creates a table of `limits.min` empty slots.
    ///
    /// Fails if the initial size exceeds the declared maximum or `ceiling`,
    /// or if the slots cannot be allocated.
    pub fn new(limits: Limits, ceiling: u32) -> Result<Self, RuntimeError> {
        let maximum = limits.max.map_or(ceiling, |max| max.min(ceiling));
        let exceeds = || RuntimeError::TableExceedsMax {
            initial: limits.min,
            maximum,
        };
        if limits.min > maximum {
            return Err(exceeds());
        }

        let mut elements = Vec::new();
        elements
            .try_reserve_exact(limits.min as usize)
            .map_err(|_| exceeds())?;
        elements.resize(limits.min as usize, None);
        Ok(Table { elements, limits })
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Function index stored at `index`, or `None` for an empty slot.
    pub fn get(&self, index: u32) -> Result<Option<u32>, RuntimeError> {
        self.elements
            .get(index as usize)
            .copied()
            .ok_or(RuntimeError::TableAccessOutOfBounds(index))
    }

    /// Writes an element segment starting at `offset`. Nothing is written if
    /// the segment does not fit.
    pub fn initialize(&mut self, offset: u32, functions: &[u32]) -> Result<(), RuntimeError> {
        let start = offset as usize;
        let end = start
            .checked_add(functions.len())
            .filter(|end| *end <= self.elements.len())
            .ok_or(RuntimeError::ElementsExceedTable {
                offset,
                len: functions.len(),
                size: self.size(),
            })?;
        for (slot, function) in self.elements[start..end].iter_mut().zip(functions) {
            *slot = Some(*function);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_table_is_empty() {
        let table = Table::new(Limits { min: 3, max: None }, 16).unwrap();
        assert_eq!(table.size(), 3);
        assert_eq!(table.get(2).unwrap(), None);
        assert_eq!(table.get(3).unwrap_err().code(), "TBL_ACCESS_OOB");
    }

    #[test]
    fn test_initial_exceeds_max() {
        let err = Table::new(Limits { min: 4, max: Some(2) }, 16).unwrap_err();
        assert_eq!(err.code(), "TBL_EXCEED_MAX");
    }

    #[test]
    fn test_initial_exceeds_ceiling() {
        let err = Table::new(Limits { min: u32::MAX, max: None }, 1 << 20).unwrap_err();
        assert_eq!(
            err,
            RuntimeError::TableExceedsMax {
                initial: u32::MAX,
                maximum: 1 << 20
            }
        );
        assert_eq!(err.code(), "TBL_EXCEED_MAX");

        // the ceiling also caps a larger declared maximum
        let err = Table::new(Limits { min: 20, max: Some(100) }, 10).unwrap_err();
        assert_eq!(err.code(), "TBL_EXCEED_MAX");
        assert_eq!(Table::new(Limits { min: 10, max: Some(100) }, 10).unwrap().size(), 10);
    }

    #[test]
    fn test_initialize() {
        let mut table = Table::new(Limits { min: 4, max: Some(4) }, 16).unwrap();
        table.initialize(1, &[7, 8]).unwrap();
        assert_eq!(table.get(0).unwrap(), None);
        assert_eq!(table.get(1).unwrap(), Some(7));
        assert_eq!(table.get(2).unwrap(), Some(8));

        let err = table.initialize(3, &[1, 2]).unwrap_err();
        assert_eq!(err.code(), "TBL_ELEM_EXCEED_MAX");
        assert_eq!(table.get(3).unwrap(), None);

        table.initialize(4, &[]).unwrap();
    }
}
