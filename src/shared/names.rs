pub const MAX_USERNAME_LENGTH: usize = 10;

/// Usernames are 1 to 10 characters and must carry at least one
/// non-whitespace character.
pub fn valid_username(name: &str) -> bool {
  !name.trim().is_empty() && name.chars().count() <= MAX_USERNAME_LENGTH
}
