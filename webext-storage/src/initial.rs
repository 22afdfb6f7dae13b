use webext_storage_reactive::Cell;

/// Initial value, given either directly or as a cell whose current value is
/// read once at construction.
#[derive(Debug, Clone)]
pub enum MaybeCell<T> {
    Value(T),
    Cell(Cell<T>),
}

impl<T: Clone + PartialEq + Send + Sync + 'static> MaybeCell<T> {
    /// Resolves to a plain value; later changes to a source cell are not seen.
    pub fn snapshot(&self) -> T {
        match self {
            MaybeCell::Value(value) => value.clone(),
            MaybeCell::Cell(cell) => cell.get(),
        }
    }
}

impl<T> From<T> for MaybeCell<T> {
    fn from(value: T) -> Self {
        MaybeCell::Value(value)
    }
}

impl<T> From<&Cell<T>> for MaybeCell<T> {
    fn from(cell: &Cell<T>) -> Self {
        MaybeCell::Cell(cell.clone())
    }
}
