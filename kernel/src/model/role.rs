use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_names_match_their_stored_form() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
    }
}
