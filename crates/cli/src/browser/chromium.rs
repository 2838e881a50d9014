use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::emulation::{SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams};
use chromiumoxide::cdp::browser_protocol::input::{
	DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, SetCookiesParams, TimeSinceEpoch};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::Deserialize;
use streak::{BrowserPage, ElementQuery, EngineError, Key, SessionContext};
use streak_protocol::{Cookie, SameSite, Viewport};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// How to start Chromium.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
	pub headless: bool,
	pub viewport: Viewport,
}

/// A launched browser with the one page the engine drives.
pub struct ChromiumSession {
	browser: Browser,
	handler_task: JoinHandle<()>,
	page: ChromiumPage,
}

impl ChromiumSession {
	pub async fn launch(options: LaunchOptions) -> Result<Self> {
		debug!(target = "streak.browser", headless = options.headless, "launching chromium");
		let mut builder = BrowserConfig::builder()
			.window_size(options.viewport.width, options.viewport.height)
			.arg("--disable-blink-features=AutomationControlled");
		if !options.headless {
			builder = builder.with_head();
		}
		let config = builder.build().map_err(CliError::Browser)?;

		let (browser, mut handler) = Browser::launch(config).await?;
		let handler_task = tokio::spawn(async move {
			while let Some(event) = handler.next().await {
				if let Err(err) = event {
					warn!(target = "streak.browser", error = %err, "cdp handler error");
				}
			}
		});

		let page = browser.new_page("about:blank").await?;
		Ok(Self {
			browser,
			handler_task,
			page: ChromiumPage { page },
		})
	}

	pub fn page(&self) -> &ChromiumPage {
		&self.page
	}

	pub async fn close(mut self) {
		if let Err(err) = self.browser.close().await {
			warn!(target = "streak.browser", error = %err, "browser close failed");
		}
		let _ = self.browser.wait().await;
		self.handler_task.abort();
	}
}

/// [`BrowserPage`] over a chromiumoxide page.
///
/// Element queries run as evaluated JS so that the text filter can look at
/// rendered text and the accessibility attributes in one pass.
pub struct ChromiumPage {
	page: Page,
}

#[derive(Debug, Deserialize)]
struct Point {
	x: f64,
	y: f64,
}

fn cdp(err: CdpError) -> EngineError {
	EngineError::Browser(err.to_string())
}

/// JS expression evaluating `body` with `matches` bound to the query's elements.
fn query_script(query: &ElementQuery, body: &str) -> String {
	let css = serde_json::to_string(&query.css).unwrap_or_else(|_| "\"\"".into());
	let needles = match &query.text {
		Some(text) => serde_json::to_string(text.needles()).unwrap_or_else(|_| "[]".into()),
		None => "null".into(),
	};
	format!(
		r#"(() => {{
	const needles = {needles};
	const label = (el) => [el.innerText, el.getAttribute('aria-label'), el.getAttribute('placeholder'), el.getAttribute('data-placeholder')]
		.filter(Boolean).join(' ').toLowerCase();
	const matches = Array.from(document.querySelectorAll({css}))
		.filter((el) => !needles || needles.some((n) => label(el).includes(n)));
	{body}
}})()"#
	)
}

const VISIBLE_BODY: &str = r#"const el = matches[__NTH__];
	if (!el || !el.isConnected) return false;
	const rect = el.getBoundingClientRect();
	const style = window.getComputedStyle(el);
	return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none' && !el.disabled;"#;

const CENTRE_BODY: &str = r#"const el = matches[__NTH__];
	if (!el) return null;
	el.scrollIntoView({ block: 'center', inline: 'center' });
	const rect = el.getBoundingClientRect();
	return { x: rect.left + rect.width / 2, y: rect.top + rect.height / 2 };"#;

const FOCUS_CLEAR_BODY: &str = r#"const el = matches[__NTH__];
	if (!el) return false;
	el.scrollIntoView({ block: 'center' });
	el.focus();
	if (el.isContentEditable) {
		document.execCommand('selectAll', false, null);
		document.execCommand('delete', false, null);
	} else if ('value' in el) {
		el.value = '';
		el.dispatchEvent(new Event('input', { bubbles: true }));
	}
	return document.activeElement === el || el.contains(document.activeElement);"#;

impl ChromiumPage {
	async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> streak::Result<T> {
		let result = self.page.evaluate(script).await.map_err(cdp)?;
		result.into_value::<T>().map_err(EngineError::from)
	}

	async fn eval_nth<T: serde::de::DeserializeOwned>(&self, query: &ElementQuery, nth: usize, body: &str) -> streak::Result<T> {
		self.eval(query_script(query, &body.replace("__NTH__", &nth.to_string()))).await
	}

	async fn mouse(&self, kind: DispatchMouseEventType, at: &Point) -> streak::Result<()> {
		let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(at.x).y(at.y);
		if kind != DispatchMouseEventType::MouseMoved {
			builder = builder.button(MouseButton::Left).click_count(1);
		}
		let params = builder.build().map_err(EngineError::Browser)?;
		self.page.execute(params).await.map_err(cdp)?;
		Ok(())
	}

	async fn key(&self, kind: DispatchKeyEventType, key: Key) -> streak::Result<()> {
		let vk = match key {
			Key::Enter => 13,
			Key::Tab => 9,
		};
		let mut builder = DispatchKeyEventParams::builder()
			.r#type(kind.clone())
			.key(key.name())
			.code(key.name())
			.windows_virtual_key_code(vk);
		if key == Key::Enter && kind == DispatchKeyEventType::KeyDown {
			builder = builder.text("\r");
		}
		let params = builder.build().map_err(EngineError::Browser)?;
		self.page.execute(params).await.map_err(cdp)?;
		Ok(())
	}

	/// Cookies the browser currently holds for the page's URL.
	pub async fn cookies(&self) -> Result<Vec<Cookie>> {
		let cookies = self.page.get_cookies().await?;
		Ok(cookies
			.into_iter()
			.map(|c| Cookie {
				name: c.name,
				value: c.value,
				domain: Some(c.domain),
				path: Some(c.path),
				expires: (!c.session).then_some(c.expires),
				http_only: Some(c.http_only),
				secure: Some(c.secure),
				same_site: c.same_site.map(|s| match s {
					CookieSameSite::Strict => SameSite::Strict,
					CookieSameSite::Lax => SameSite::Lax,
					CookieSameSite::None => SameSite::None,
				}),
			})
			.collect())
	}
}

fn cookie_param(cookie: &Cookie) -> streak::Result<CookieParam> {
	let mut builder = CookieParam::builder().name(cookie.name.clone()).value(cookie.value.clone());
	if let Some(domain) = &cookie.domain {
		builder = builder.domain(domain.clone());
	}
	builder = builder.path(cookie.path.clone().unwrap_or_else(|| "/".into()));
	if let Some(secure) = cookie.secure {
		builder = builder.secure(secure);
	}
	if let Some(http_only) = cookie.http_only {
		builder = builder.http_only(http_only);
	}
	if let Some(same_site) = cookie.same_site {
		builder = builder.same_site(match same_site {
			SameSite::Strict => CookieSameSite::Strict,
			SameSite::Lax => CookieSameSite::Lax,
			SameSite::None => CookieSameSite::None,
		});
	}
	if let Some(expires) = cookie.expires.filter(|_| !cookie.is_session()) {
		builder = builder.expires(TimeSinceEpoch::new(expires));
	}
	builder.build().map_err(EngineError::Browser)
}

fn timeout_error(timeout: Duration, condition: String) -> EngineError {
	EngineError::Timeout {
		ms: timeout.as_millis() as u64,
		condition,
	}
}

#[async_trait]
impl BrowserPage for ChromiumPage {
	async fn apply_session(&self, session: &SessionContext) -> streak::Result<()> {
		let cookies = session.cookies().iter().map(cookie_param).collect::<streak::Result<Vec<_>>>()?;
		self.page.execute(SetCookiesParams::new(cookies)).await.map_err(cdp)?;
		self.page
			.execute(SetUserAgentOverrideParams::new(session.user_agent()))
			.await
			.map_err(cdp)?;
		let viewport = session.viewport();
		self.page
			.execute(SetDeviceMetricsOverrideParams::new(
				i64::from(viewport.width),
				i64::from(viewport.height),
				1.0,
				false,
			))
			.await
			.map_err(cdp)?;
		debug!(target = "streak.browser", cookies = session.cookies().len(), "session applied");
		Ok(())
	}

	async fn goto(&self, url: &str, timeout: Duration) -> streak::Result<()> {
		debug!(target = "streak.browser", %url, "goto");
		match tokio::time::timeout(timeout, self.page.goto(url)).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(EngineError::Navigation {
				url: url.to_string(),
				message: err.to_string(),
			}),
			Err(_) => Err(timeout_error(timeout, format!("load of {url}"))),
		}
	}

	async fn reload(&self, timeout: Duration) -> streak::Result<()> {
		match tokio::time::timeout(timeout, self.page.reload()).await {
			Ok(Ok(_)) => Ok(()),
			Ok(Err(err)) => Err(cdp(err)),
			Err(_) => Err(timeout_error(timeout, "reload".into())),
		}
	}

	async fn current_url(&self) -> streak::Result<String> {
		Ok(self.page.url().await.map_err(cdp)?.unwrap_or_default())
	}

	async fn title(&self) -> streak::Result<String> {
		Ok(self.page.get_title().await.map_err(cdp)?.unwrap_or_default())
	}

	async fn content(&self) -> streak::Result<String> {
		self.page.content().await.map_err(cdp)
	}

	async fn count(&self, query: &ElementQuery) -> streak::Result<usize> {
		self.eval(query_script(query, "return matches.length;")).await
	}

	async fn is_visible(&self, query: &ElementQuery, nth: usize) -> streak::Result<bool> {
		self.eval_nth(query, nth, VISIBLE_BODY).await
	}

	async fn click(&self, query: &ElementQuery, nth: usize) -> streak::Result<()> {
		let at: Option<Point> = self.eval_nth(query, nth, CENTRE_BODY).await?;
		let at = at.ok_or_else(|| EngineError::Detached(format!("{query} #{nth}")))?;
		debug!(target = "streak.browser", query = %query, nth, x = at.x, y = at.y, "click");
		self.mouse(DispatchMouseEventType::MouseMoved, &at).await?;
		self.mouse(DispatchMouseEventType::MousePressed, &at).await?;
		self.mouse(DispatchMouseEventType::MouseReleased, &at).await
	}

	async fn fill(&self, query: &ElementQuery, nth: usize, text: &str) -> streak::Result<()> {
		let focused: bool = self.eval_nth(query, nth, FOCUS_CLEAR_BODY).await?;
		if !focused {
			return Err(EngineError::Detached(format!("{query} #{nth}")));
		}
		self.type_text(text).await
	}

	async fn press(&self, key: Key) -> streak::Result<()> {
		self.key(DispatchKeyEventType::KeyDown, key).await?;
		self.key(DispatchKeyEventType::KeyUp, key).await
	}

	async fn type_text(&self, text: &str) -> streak::Result<()> {
		self.page.execute(InsertTextParams::new(text)).await.map_err(cdp)?;
		Ok(())
	}

	async fn screenshot(&self, path: &Path) -> streak::Result<()> {
		self.page
			.save_screenshot(ScreenshotParams::builder().full_page(true).build(), path)
			.await
			.map_err(cdp)?;
		Ok(())
	}
}
