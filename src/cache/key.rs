use std::fmt;

/// Cache lookup identity: a logical resource name plus a page number.
///
/// Two keys are equal iff both components are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  pub resource: String,
  pub page: u32,
}

impl QueryKey {
  pub fn new(resource: impl Into<String>, page: u32) -> Self {
    Self {
      resource: resource.into(),
      page,
    }
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}[page={}]", self.resource, self.page)
  }
}
