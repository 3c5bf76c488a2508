use anyhow::Context;
use axum::{
    handler::HandlerWithoutStateExt,
    http::{uri::Authority, StatusCode, Uri},
    response::Redirect,
    BoxError,
};
use axum_extra::extract::Host;
use axum_server::tls_rustls::RustlsConfig;
use ride_share_data_management::DataManager;
use server::{
    config::Config,
    mail::{LogMailer, Mailer, SmtpMailer},
    server_state::ServerState,
};
use std::{fs::OpenOptions, net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy)]
struct Ports {
    http: u16,
    https: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log dir {:?}", config.log_dir))?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_dir.join("server.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=debug,ride_share_data_management=debug,info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    tracing::info!("Starting server...");

    let data_manager = DataManager::open(&config.database).await
        .with_context(|| format!("Failed to open database {:?}", config.database))?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => {
            tracing::info!("Sending email through {}:{}", smtp.host, smtp.port);
            Arc::new(SmtpMailer::new(smtp)?)
        },
        None => {
            tracing::warn!("SMTP_HOST not set, emails will only be logged");
            Arc::new(LogMailer)
        },
    };

    let server_state = ServerState::new(data_manager, mailer, config.broadcast_capacity, config.mail_queue_capacity);
    let app = server::app(server_state, &config.static_dir)
        .into_make_service_with_connect_info::<SocketAddr>();

    match &config.tls {
        Some(tls) => {
            let ports = Ports {
                http: tls.http_port,
                https: config.addr.port(),
            };
            tokio::spawn(redirect_http_to_https(config.addr, ports));

            // configure certificate and private key used by https
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await
                .context("Failed to load TLS certificate")?;

            tracing::info!("Listening on https://{}", config.addr);
            axum_server::bind_rustls(config.addr, rustls)
                .serve(app)
                .await?;
        },
        None => {
            let listener = tokio::net::TcpListener::bind(config.addr).await
                .with_context(|| format!("Failed to bind {}", config.addr))?;
            tracing::info!("Listening on http://{}", listener.local_addr()?);
            axum::serve(listener, app).await?;
        },
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn redirect_http_to_https(addr: SocketAddr, ports: Ports) {
    fn make_https(host: &str, uri: Uri, https_port: u16) -> Result<Uri, BoxError> {
        let mut parts = uri.into_parts();

        parts.scheme = Some(axum::http::uri::Scheme::HTTPS);

        if parts.path_and_query.is_none() {
            parts.path_and_query = Some("/".parse()?);
        }

        let authority: Authority = host.parse()?;
        let bare_host = authority.host();

        parts.authority = Some(format!("{bare_host}:{https_port}").parse()?);

        Ok(Uri::from_parts(parts)?)
    }

    let redirect = move |Host(host): Host, uri: Uri| async move {
        match make_https(&host, uri, ports.https) {
            Ok(uri) => Ok(Redirect::permanent(&uri.to_string())),
            Err(error) => {
                tracing::warn!(%error, "failed to convert URI to HTTPS");
                Err(StatusCode::BAD_REQUEST)
            }
        }
    };

    let addr = SocketAddr::new(addr.ip(), ports.http);
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind HTTP redirect on {addr}: {err}");
            return;
        },
    };
    tracing::info!("Redirecting http://{addr} to https");
    if let Err(err) = axum::serve(listener, redirect.into_make_service()).await {
        tracing::error!("HTTP redirect stopped: {err}");
    }
}
