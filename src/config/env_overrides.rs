use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("LEXTRO_GEMINI_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            && !key.is_empty()
        {
            self.generation.api_key = Some(key);
        }

        if let Ok(model) = std::env::var("LEXTRO_GEMINI_MODEL")
            && !model.is_empty()
        {
            self.generation.model = model;
        }

        if let Ok(url) = std::env::var("LEXTRO_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            && !url.is_empty()
        {
            self.database.url = Some(url);
        }

        if let Ok(port_str) = std::env::var("LEXTRO_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.server.port = port;
        }

        if let Ok(host) = std::env::var("LEXTRO_HOST")
            && !host.is_empty()
        {
            self.server.host = host;
        }

        if let Ok(backend) = std::env::var("LEXTRO_BACKEND_URL")
            && !backend.is_empty()
        {
            self.extension.backend_url = backend;
        }
    }
}
