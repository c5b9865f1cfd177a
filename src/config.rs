use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub generation_api_key: String,
    pub generation_base_url: String,
    /// Ordered candidate model chain, primary first.
    pub generation_models: Vec<String>,
    pub generation_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()
                .expect("PORT must be a number"),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            generation_api_key: env::var("GENERATION_API_KEY").unwrap_or_else(|_| String::new()),
            generation_base_url: env::var("GENERATION_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into()),
            generation_models: parse_model_chain(
                &env::var("GENERATION_MODELS").unwrap_or_else(|_| {
                    "claude-sonnet-4-20250514,claude-3-5-haiku-20241022".into()
                }),
            ),
            generation_timeout_secs: env::var("GENERATION_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()
                .unwrap_or(30),
        }
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_model_chain(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_chain_preserves_order_and_skips_blanks() {
        let models = parse_model_chain("primary, fallback-a,, fallback-b ,");
        assert_eq!(models, vec!["primary", "fallback-a", "fallback-b"]);
    }
}
