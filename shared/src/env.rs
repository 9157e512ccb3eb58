use std::env;

pub const ENV_KEY: &str = "ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

pub fn which() -> Environment {
    #[cfg(debug_assertions)]
    let default_env = Environment::Development;
    #[cfg(not(debug_assertions))]
    let default_env = Environment::Production;

    match env::var(ENV_KEY) {
        Ok(v) if v == "production" => Environment::Production,
        Ok(_) => Environment::Development,
        Err(_) => default_env,
    }
}
