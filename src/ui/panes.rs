/// Panes of the post editor, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    /// Pane 1: title, provider, tags, excerpt and the two checkboxes
    Fields,
    /// Pane 2: key/value metadata table
    Meta,
    /// Pane 3: attached files
    Files,
}

impl Pane {
    pub fn title(self) -> &'static str {
        match self {
            Pane::Fields => "POST",
            Pane::Meta => "META",
            Pane::Files => "FILES",
        }
    }

    pub fn digit(self) -> char {
        match self {
            Pane::Fields => '1',
            Pane::Meta => '2',
            Pane::Files => '3',
        }
    }

    pub fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '1' => Some(Pane::Fields),
            '2' => Some(Pane::Meta),
            '3' => Some(Pane::Files),
            _ => None,
        }
    }

    /// Next pane, wrapping around
    pub fn next(self) -> Self {
        match self {
            Pane::Fields => Pane::Meta,
            Pane::Meta => Pane::Files,
            Pane::Files => Pane::Fields,
        }
    }

    /// Previous pane, wrapping around
    pub fn prev(self) -> Self {
        match self {
            Pane::Fields => Pane::Files,
            Pane::Meta => Pane::Fields,
            Pane::Files => Pane::Meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle() {
        assert_eq!(Pane::Fields.next().next().next(), Pane::Fields);
        assert_eq!(Pane::Fields.prev(), Pane::Files);
        for pane in [Pane::Fields, Pane::Meta, Pane::Files] {
            assert_eq!(Pane::from_digit(pane.digit()), Some(pane));
        }
    }
}
