//! Demo client page
//!
//! A minimal browser client that opens a subscription and renders the
//! quote stream; stands in for a real frontend.

use axum::{response::Html, routing::get, Router};

use crate::AppState;

const CLIENT_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Quote Stream</title>
  <style>
    body { font-family: monospace; margin: 2em; }
    #log div { border-bottom: 1px solid #ddd; padding: 4px 0; }
  </style>
</head>
<body>
  <h1>Quote Stream</h1>
  <form id="form">
    <input id="fsyms" value="BTC" size="8">
    <input id="tsyms" value="USD" size="8">
    <button type="submit">Subscribe</button>
  </form>
  <div id="log"></div>
  <script>
    let ws = null;
    const log = document.getElementById("log");

    document.getElementById("form").onsubmit = (event) => {
      event.preventDefault();
      if (ws) { ws.close(); }
      log.innerHTML = "";

      const fsyms = document.getElementById("fsyms").value.split(",");
      const tsyms = document.getElementById("tsyms").value.split(",");
      const params = new URLSearchParams();
      fsyms.forEach((s) => params.append("fsyms", s.trim()));
      tsyms.forEach((s) => params.append("tsyms", s.trim()));

      const proto = location.protocol === "https:" ? "wss:" : "ws:";
      ws = new WebSocket(proto + "//" + location.host + "/ws?" + params);

      ws.onmessage = (msg) => {
        const entry = document.createElement("div");
        entry.textContent = msg.data;
        log.prepend(entry);
      };
      ws.onclose = (event) => {
        const entry = document.createElement("div");
        entry.textContent = "closed: " + (event.reason || "connection closed");
        log.prepend(entry);
      };
    };
  </script>
</body>
</html>
"#;

async fn client_page() -> Html<&'static str> {
    Html(CLIENT_PAGE)
}

/// Create demo page routes
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(client_page))
}
