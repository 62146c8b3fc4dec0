use gcp_iam_credentials::{
    Application, ExecutionContext, GcpAuthCredentials, IamCredentialsConfig, RequestExt,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<IamCredentialsConfig, Box<dyn std::error::Error>> {
    if let Ok(path) = std::env::var("IAM_CREDENTIALS_CONFIG") {
        let json = std::fs::read_to_string(path)?;
        return Ok(IamCredentialsConfig::from_json(&json)?);
    }
    let service_account = std::env::var("IAM_SERVICE_ACCOUNT").unwrap_or_else(|_| "default".into());
    Ok(IamCredentialsConfig::new(service_account))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let app = Application::current()?;
    let google_cloud = app.google_cloud();
    google_cloud.set_credentials(Arc::new(GcpAuthCredentials::from_environment().await?))?;
    google_cloud
        .iam_service_account_credentials()
        .set_configuration(load_config()?)?;

    let mut request = http::Request::new(());
    app.bind_request(&mut request, ExecutionContext::current()?);
    let client = request.iam_service_account_credentials()?;

    let authorized = client.authorize(client.service_account_name()).await?;
    println!("{}", authorized.get_ref());
    println!("{}", client.transport().uri());

    app.shutdown();
    Ok(())
}
