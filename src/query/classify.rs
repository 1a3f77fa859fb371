/// Minimum length for an all-digit query to be treated as a code
pub const MIN_CODE_LEN: usize = 4;

/// How a query string will be answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Two letters: every record of that partition (uppercased code)
    Partition(String),
    /// Four or more digits: exact TOM or IBGE code match
    Code(String),
    /// Anything else: substring of either name
    Name(String),
}

/// Strategy tag carried in search outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Partition,
    Code,
    Name,
}

impl QueryKind {
    pub fn strategy(&self) -> Strategy {
        match self {
            QueryKind::Partition(_) => Strategy::Partition,
            QueryKind::Code(_) => Strategy::Code,
            QueryKind::Name(_) => Strategy::Name,
        }
    }
}

/// Classify a query string; the first matching rule wins
pub fn classify(input: &str) -> QueryKind {
    if input.chars().count() == 2 && input.chars().all(char::is_alphabetic) {
        // Some letters expand when uppercased (ß -> SS)
        let code = input.to_uppercase();
        if code.chars().count() == 2 {
            return QueryKind::Partition(code);
        }
    }

    if input.len() >= MIN_CODE_LEN && input.bytes().all(|b| b.is_ascii_digit()) {
        return QueryKind::Code(input.to_string());
    }

    QueryKind::Name(input.to_string())
}
