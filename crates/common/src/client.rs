#[async_trait::async_trait]
pub trait ModuleClient: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    type Client;

    fn validate_env() -> bool;
    async fn setup_connection() -> Self;

    fn get_client(&self) -> &Self::Client;
}

/// Declares a process-lifetime client handle for an external collaborator.
///
/// The generated struct wraps the underlying client in an `Arc` so it can be
/// cloned into request state cheaply. Environment variables are validated
/// before the setup block runs; a missing variable is a startup failure, not
/// a per-request one.
#[macro_export]
macro_rules! define_module_client {
    {
        (struct $struct_name:ident, $client_name:expr)
        client_type: $client_type:ty,
        env: [ $( $env_var:literal ),* ],
        setup: $setup_logic:expr
    } => {
        #[derive(Clone, Default)]
        pub struct $struct_name {
            client: Option<std::sync::Arc<$client_type>>,
        }

        #[async_trait::async_trait]
        impl ::loremaster_common::ModuleClient for $struct_name {
            const NAME: &'static str = $client_name;
            type Client = std::sync::Arc<$client_type>;

            fn validate_env() -> bool {
                const ENV_VARS: &'static [&'static str] = &[ $( $env_var ),* ];
                let missing = ENV_VARS.iter()
                    .filter(|var| std::env::var(var).is_err())
                    .cloned()
                    .collect::<Vec<_>>();

                if missing.is_empty() {
                    return true;
                }

                tracing::error!(
                    "[Client: {}] missing environment variables: [{}]",
                    $client_name, missing.join(", ")
                );
                false
            }

            async fn setup_connection() -> Self {
                if !Self::validate_env() {
                    panic!("[Client: {}] environment is incomplete, cannot setup connection", $client_name);
                }

                let client = $setup_logic.await;
                Self {
                    client: Some(std::sync::Arc::new(client)),
                }
            }

            fn get_client(&self) -> &Self::Client {
                self.client.as_ref()
                    .expect("client not connected, call setup_connection first")
            }
        }
    }
}
