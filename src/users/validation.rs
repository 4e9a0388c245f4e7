use crate::error::PanelError;

pub fn username(value: &str) -> Result<(), PanelError> {
    let len = value.chars().count();
    if !(3..=20).contains(&len) {
        return Err(PanelError::validation(
            "username must be between 3 and 20 characters",
        ));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PanelError::validation(
            "username may only contain letters and digits",
        ));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), PanelError> {
    let len = value.chars().count();
    if !(6..=50).contains(&len) {
        return Err(PanelError::validation(
            "password must be between 6 and 50 characters",
        ));
    }
    Ok(())
}

pub fn email(value: &str) -> Result<(), PanelError> {
    let invalid = || PanelError::validation(format!("{value:?} is not a valid email address"));
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    let domain_ok = domain
        .split('.')
        .all(|label| !label.is_empty() && !label.contains(char::is_whitespace))
        && domain.contains('.');
    if local.is_empty() || local.contains(char::is_whitespace) || domain.contains('@') || !domain_ok
    {
        return Err(invalid());
    }
    Ok(())
}

pub fn avatar(value: &str) -> Result<(), PanelError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| PanelError::validation(format!("avatar must be a URL: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(username("admin").is_ok());
        assert!(username("ab").is_err());
        assert!(username("a".repeat(21).as_str()).is_err());
        assert!(username("bad name").is_err());
        assert!(username("dash-ed").is_err());
    }

    #[test]
    fn passwords() {
        assert!(password("123456").is_ok());
        assert!(password("12345").is_err());
        assert!(password(&"x".repeat(51)).is_err());
    }

    #[test]
    fn emails() {
        assert!(email("ops@example.com").is_ok());
        assert!(email("ops@localhost").is_err());
        assert!(email("@example.com").is_err());
        assert!(email("a@b@c.com").is_err());
        assert!(email("ops@example..com").is_err());
    }

    #[test]
    fn avatars() {
        assert!(avatar("https://cdn.example.com/a.png").is_ok());
        assert!(avatar("not a url").is_err());
    }
}
