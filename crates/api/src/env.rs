use loremaster_common::EnvVars;

pub struct ApiServerEnv {
    pub port: String,
    pub dm_prompt_path: Option<String>,
}

impl EnvVars for ApiServerEnv {
    fn load() -> Self {
        Self {
            port: std::env::var("PORT").unwrap_or("8000".to_string()),
            dm_prompt_path: std::env::var("DM_PROMPT_PATH").ok(),
        }
    }

    fn get_env_var(&self, key: &str) -> String {
        match key {
            "PORT" => self.port.clone(),
            "DM_PROMPT_PATH" => self.dm_prompt_path.clone().unwrap_or_default(),
            _ => panic!("{} is not set", key),
        }
    }
}
