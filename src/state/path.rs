use crate::infra::Position;

/// Ordered steps toward a target, never including the starting tile and never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path(Vec<Position>);

impl Path {
    pub fn new(steps: Vec<Position>) -> Option<Self> {
        if steps.is_empty() {
            None
        } else {
            Some(Self(steps))
        }
    }

    pub fn first(&self) -> Position {
        self.0[0]
    }

    pub fn last(&self) -> Position {
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn steps(&self) -> &[Position] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.0.iter()
    }
}

impl From<Path> for Vec<Position> {
    fn from(path: Path) -> Self {
        path.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_path_is_rejected() {
        assert!(Path::new(Vec::new()).is_none());
    }

    #[test]
    fn test_endpoints() {
        let path = Path::new(vec![Position::new(1, 0), Position::new(2, 0), Position::new(2, 1)])
            .expect("non-empty");
        assert_eq!(path.first(), Position::new(1, 0));
        assert_eq!(path.last(), Position::new(2, 1));
        assert_eq!(path.len(), 3);
    }
}
