use std::collections::HashSet;
use std::env;
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use glob::Pattern;
use notify::{EventKind, RecursiveMode};
use notify_debouncer_full::new_debouncer;
use tungstenite::WebSocket;

use crate::config::Config;
use crate::data::SiteData;
use crate::error::WatchError;
use crate::{Globals, Mode, Pipeline};

fn reserve_port() -> Result<(TcpListener, u16), WatchError> {
    let listener = match TcpListener::bind("127.0.0.1:1337") {
        Ok(sock) => sock,
        Err(_) => TcpListener::bind("127.0.0.1:0").map_err(WatchError::Bind)?,
    };

    let addr = listener.local_addr().map_err(WatchError::Bind)?;
    let port = addr.port();
    Ok((listener, port))
}

/// Run the initial build, then keep re-running bound tasks on source
/// changes while serving the build directory with live reload. Rebuild
/// failures are reported and the watcher keeps running; process
/// termination is the expected way out.
pub fn watch(pipeline: &Pipeline, config: Config, data: SiteData) -> anyhow::Result<()> {
    let root = env::current_dir()?;
    let (tcp, port) = reserve_port()?;
    let clients = Arc::new(Mutex::new(vec![]));

    let (tx, rx) = std::sync::mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(250), None, tx)?;
    debouncer.watch(config.src.as_std_path(), RecursiveMode::Recursive)?;

    let bindings = bindings(pipeline)?;

    let thread_i = new_thread_ws_incoming(tcp, clients.clone());
    let (tx_reload, thread_o) = new_thread_ws_reload(clients.clone());

    let globals = Globals {
        mode: Mode::Watch,
        port: Some(port),
        config,
        data,
    };

    pipeline.build(&globals)?;

    let thread_http = server::start(&globals.config);

    while let Ok(events) = rx.recv()? {
        let changed = match events
            .iter()
            .filter(|de| {
                matches!(
                    de.event.kind,
                    EventKind::Create(..) | EventKind::Modify(..) | EventKind::Remove(..)
                )
            })
            .flat_map(|de| &de.event.paths)
            .try_fold(
                HashSet::new(),
                |mut acc, path| -> Result<_, anyhow::Error> {
                    let path = path.strip_prefix(&root).unwrap_or(path);
                    let path = Utf8PathBuf::try_from(path.to_path_buf())?;
                    acc.insert(path);
                    Ok(acc)
                },
            ) {
            Ok(ok) => ok,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        if changed.is_empty() {
            continue;
        }

        let names = bound_tasks(&bindings, &changed);
        if names.is_empty() {
            continue;
        }

        let start = Instant::now();
        let mut failed = false;

        for name in names {
            if let Err(e) = pipeline.run(name, &globals) {
                eprintln!("Encountered an error while rebuilding: {e}");
                failed = true;
            }
        }

        if !failed {
            tx_reload.send(())?;
            println!("Refreshed in {:?}", start.elapsed());
        }
    }

    thread_i.join().unwrap();
    thread_o.join().unwrap();
    thread_http.join().unwrap()?;

    Ok(())
}

/// Compile each task's watch binding once.
fn bindings(pipeline: &Pipeline) -> Result<Vec<(Pattern, &'static str)>, WatchError> {
    pipeline
        .tasks()
        .filter_map(|task| task.watch_pattern().map(|pattern| (pattern, task.name)))
        .map(|(pattern, name)| Ok((Pattern::new(pattern)?, name)))
        .collect()
}

/// Tasks whose binding matches any changed path, in registration order.
/// A task appears at most once per event batch no matter how many of its
/// files changed.
fn bound_tasks(
    bindings: &[(Pattern, &'static str)],
    changed: &HashSet<Utf8PathBuf>,
) -> Vec<&'static str> {
    bindings
        .iter()
        .filter(|(pattern, _)| changed.iter().any(|path| pattern.matches(path.as_str())))
        .map(|(_, name)| *name)
        .collect()
}

fn new_thread_ws_incoming(
    server: TcpListener,
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for stream in server.incoming() {
            match stream.map(tungstenite::accept) {
                Ok(Ok(socket)) => clients.lock().unwrap().push(socket),
                Ok(Err(e)) => eprintln!("Websocket handshake failed: {e}"),
                Err(e) => eprintln!("Websocket connection failed: {e}"),
            }
        }
    })
}

fn new_thread_ws_reload(
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
) -> (Sender<()>, JoinHandle<()>) {
    let (tx, rx) = std::sync::mpsc::channel();

    let thread = std::thread::spawn(move || {
        while rx.recv().is_ok() {
            let mut clients = clients.lock().unwrap();
            let mut broken = vec![];

            for (i, socket) in clients.iter_mut().enumerate() {
                match socket.send("reload".into()) {
                    Ok(_) => {}
                    Err(tungstenite::error::Error::Io(e)) => {
                        if e.kind() == std::io::ErrorKind::BrokenPipe {
                            broken.push(i);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: {e:?}");
                    }
                }
            }

            for i in broken.into_iter().rev() {
                clients.remove(i);
            }

            // Close all but the last 10 connections
            let len = clients.len();
            if len > 10 {
                for mut socket in clients.drain(0..len - 10) {
                    socket.close(None).ok();
                }
            }
        }
    });

    (tx, thread)
}

mod server {
    use std::{net::SocketAddr, thread};

    use axum::Router;
    use camino::Utf8PathBuf;
    use console::style;
    use tower_http::services::ServeDir;

    use crate::config::Config;

    pub fn start(config: &Config) -> thread::JoinHandle<Result<(), anyhow::Error>> {
        let port = config.http_port;
        let dir = config.build.clone();
        let url = style(format!("http://localhost:{port}/")).yellow();
        eprintln!("Starting a HTTP server on {url}");

        thread::spawn(move || {
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(serve(dir, port))
        })
    }

    async fn serve(dir: Utf8PathBuf, port: u16) -> Result<(), anyhow::Error> {
        let address = SocketAddr::from(([127, 0, 0, 1], port));
        let address = tokio::net::TcpListener::bind(address).await?;

        let router = Router::new()
            // everything is static content rooted at the build directory
            .fallback_service(ServeDir::new(dir));

        axum::serve(address, router).await?;

        Ok(())
    }
}
