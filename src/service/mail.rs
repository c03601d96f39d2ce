use std::{future::Future, time::Duration};

use chrono::Utc;
use derive_more::Display;
use log::{debug, info, warn};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
    time,
};

use crate::config::MailConfig;

/// Longest utf-8 run packed into one encoded word, keeping it under 75 chars.
const ENCODED_CHUNK: usize = 45;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    /// `Name <address>` or a bare address
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Debug, Display)]
pub enum MailError {
    #[display(fmt = "smtp connection failed: {}", _0)]
    Io(std::io::Error),

    #[display(fmt = "smtp server replied {} {}", code, text)]
    Rejected { code: u16, text: String },

    #[display(fmt = "smtp server closed the connection")]
    ConnectionClosed,

    #[display(fmt = "smtp server did not answer in time")]
    Timeout,

    #[display(fmt = "malformed smtp reply: {}", _0)]
    MalformedReply(String),

    #[display(fmt = "invalid mail address: {:?}", _0)]
    InvalidAddress(String),
}

impl std::error::Error for MailError {}

impl From<std::io::Error> for MailError {
    fn from(err: std::io::Error) -> Self {
        MailError::Io(err)
    }
}

#[allow(async_fn_in_trait)]
pub trait MailTransport {
    async fn send(&self, mail: &Mail) -> Result<(), MailError>;
}

/// Plain SMTP client. `secure` transports are not negotiated; the
/// connection is always cleartext.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    pub fn new(config: MailConfig) -> Self {
        if config.secure {
            warn!("smtp over tls is not supported, mail to {} goes out in cleartext", config.host);
        }
        Self { config }
    }
}

impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &Mail) -> Result<(), MailError> {
        let from = envelope_address(&self.config.default_from)?;
        let to = envelope_address(&mail.to)?;
        let message = format_message(&self.config.default_from, mail, &Utc::now().to_rfc2822())?;

        let mut session = Session::connect(&self.config).await?;
        session.command("EHLO meetapp", &[250]).await?;
        if let Some(auth) = &self.config.auth {
            session.command("AUTH LOGIN", &[334]).await?;
            session.command(&base64::encode(&auth.user), &[334]).await?;
            session.command(&base64::encode(&auth.pass), &[235]).await?;
        }
        session.command(&format!("MAIL FROM:<{from}>"), &[250]).await?;
        session.command(&format!("RCPT TO:<{to}>"), &[250, 251]).await?;
        session.command("DATA", &[354]).await?;
        session.send_raw(&message, &[250]).await?;
        session.command("QUIT", &[221]).await?;
        info!("mail {:?} delivered to {}", mail.subject, to);
        Ok(())
    }
}

/// One SMTP connection. Every exchange must complete within `timeout`.
struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    timeout: Duration,
}

impl Session {
    async fn connect(config: &MailConfig) -> Result<Self, MailError> {
        let addr = (config.host.as_str(), config.port);
        let stream = within(config.timeout, async {
            TcpStream::connect(addr).await.map_err(MailError::from)
        })
        .await?;
        let (read, writer) = stream.into_split();
        let mut session = Self {
            reader: BufReader::new(read),
            writer,
            timeout: config.timeout,
        };
        within(session.timeout, read_reply(&mut session.reader, &[220])).await?;
        Ok(session)
    }

    async fn command(&mut self, line: &str, expected: &[u16]) -> Result<String, MailError> {
        self.send_raw(&format!("{line}\r\n"), expected).await
    }

    async fn send_raw(&mut self, data: &str, expected: &[u16]) -> Result<String, MailError> {
        let Self {
            reader,
            writer,
            timeout,
        } = self;
        within(*timeout, async move {
            writer.write_all(data.as_bytes()).await?;
            writer.flush().await?;
            read_reply(reader, expected).await
        })
        .await
    }
}

async fn within<T, F>(limit: Duration, fut: F) -> Result<T, MailError>
where
    F: Future<Output = Result<T, MailError>>,
{
    time::timeout(limit, fut).await.map_err(|_| MailError::Timeout)?
}

/// Reads one (possibly multi-line) reply and checks its code.
async fn read_reply<R>(reader: &mut R, expected: &[u16]) -> Result<String, MailError>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut text = String::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(MailError::ConnectionClosed);
        }
        let line = line.trim_end();
        debug!("smtp <- {}", line);
        let code: u16 = line
            .get(..3)
            .and_then(|code| code.parse().ok())
            .ok_or_else(|| MailError::MalformedReply(line.to_string()))?;
        let more = line.as_bytes().get(3) == Some(&b'-');
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(line.get(4..).unwrap_or_default());
        if more {
            continue;
        }
        return if expected.contains(&code) {
            Ok(text)
        } else {
            Err(MailError::Rejected { code, text })
        };
    }
}

/// `Name <a@b.c>` -> `a@b.c`. Rejects anything that could break out of
/// the `<...>` of an smtp command.
pub fn envelope_address(mailbox: &str) -> Result<&str, MailError> {
    let address = match (mailbox.rfind('<'), mailbox.rfind('>')) {
        (Some(start), Some(end)) if start < end => mailbox[start + 1..end].trim(),
        _ => mailbox.trim(),
    };
    let unsafe_char = |c: char| c.is_control() || c.is_whitespace() || c == '<' || c == '>';
    if address.is_empty() || address.chars().any(unsafe_char) {
        return Err(MailError::InvalidAddress(address.to_string()));
    }
    Ok(address)
}

/// Single-line header value: control characters become spaces and
/// non-ascii text is sent as RFC 2047 encoded words.
pub fn header_text(value: &str) -> String {
    let clean: String = value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if clean.is_ascii() {
        clean
    } else {
        encode_words(&clean)
    }
}

fn encode_words(text: &str) -> String {
    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_CHUNK {
            words.push(format!("=?utf-8?B?{}?=", base64::encode(&chunk)));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(format!("=?utf-8?B?{}?=", base64::encode(&chunk)));
    }
    words.join("\r\n ")
}

/// `To`/`From` header value for `Name <address>` or a bare address.
fn mailbox_header(mailbox: &str) -> Result<String, MailError> {
    let address = envelope_address(mailbox)?;
    let name = mailbox.rfind('<').map(|start| mailbox[..start].trim()).unwrap_or_default();
    if name.is_empty() {
        return Ok(address.to_string());
    }
    let name = header_text(name);
    let special = |c: char| "()<>[]:;@\\,.\"".contains(c);
    let name = if name.is_ascii() && !name.starts_with("=?") && name.contains(special) {
        format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        name
    };
    Ok(format!("{name} <{address}>"))
}

/// Headers and body terminated by the lone `.` line, with dot-stuffing.
pub fn format_message(from: &str, mail: &Mail, date: &str) -> Result<String, MailError> {
    let mut message = format!(
        "From: {}\r\nTo: {}\r\nSubject: {}\r\nDate: {}\r\nMIME-Version: 1.0\r\n\
        Content-Type: text/plain; charset=utf-8\r\nContent-Transfer-Encoding: 8bit\r\n\r\n",
        mailbox_header(from)?,
        mailbox_header(&mail.to)?,
        header_text(&mail.subject),
        header_text(date),
    );
    for line in mail.text.lines() {
        let line = line.replace('\r', "");
        if line.starts_with('.') {
            message.push('.');
        }
        message.push_str(&line);
        message.push_str("\r\n");
    }
    message.push_str(".\r\n");
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MailAuth,
        service::jobs::{tests::payload, SubscriptionMail},
    };
    use tokio::net::TcpListener;

    const DATE: &str = "Sat, 1 Jun 2024 12:00:00 +0000";

    fn mail() -> Mail {
        Mail {
            to: "Ana <ana@example.com>".to_string(),
            subject: "New subscription".to_string(),
            text: "Hello\n.hidden line\nbye".to_string(),
        }
    }

    fn hostile_mail() -> Mail {
        let mut payload = payload();
        payload.meetup.title = "Rust\r\n.\r\nRCPT TO:<victim@evil.test>".to_string();
        payload.meetup.organizer_name = "Ana\r\nBcc: victim@evil.test".to_string();
        SubscriptionMail::build(&payload)
    }

    fn headers(message: &str) -> &str {
        &message[..message.find("\r\n\r\n").unwrap()]
    }

    #[test]
    fn envelope_address_strips_display_name() {
        assert_eq!(envelope_address("MeetApp <noreply@meetapp.com>").unwrap(), "noreply@meetapp.com");
        assert_eq!(envelope_address(" ana@example.com ").unwrap(), "ana@example.com");
    }

    #[test]
    fn envelope_address_rejects_line_breaks() {
        for mailbox in ["ana@example.com>\r\nRCPT TO:<victim@evil.test", "Ana <a b@example.com>", "<>"] {
            assert!(matches!(envelope_address(mailbox), Err(MailError::InvalidAddress(_))), "{mailbox:?}");
        }
    }

    #[test]
    fn message_is_dot_stuffed_and_terminated() {
        let message = format_message("MeetApp <noreply@meetapp.com>", &mail(), DATE).unwrap();
        assert!(message.starts_with("From: MeetApp <noreply@meetapp.com>\r\nTo: Ana <ana@example.com>\r\n"));
        assert!(message.contains("\r\n\r\nHello\r\n..hidden line\r\nbye\r\n"));
        assert!(message.ends_with("\r\nbye\r\n.\r\n"));
    }

    #[test]
    fn line_breaks_in_titles_cannot_end_the_message_early() {
        let message = format_message("MeetApp <noreply@meetapp.com>", &hostile_mail(), DATE).unwrap();
        assert_eq!(message.find("\r\n.\r\n"), Some(message.len() - 5));

        let headers = headers(&message);
        for line in headers.split("\r\n") {
            let known = ["From: ", "To: ", "Subject: ", "Date: ", "MIME-Version: ", "Content-"];
            assert!(known.iter().any(|name| line.starts_with(name)), "{line:?}");
        }
        assert!(headers.contains("Subject: New subscription to Rust  .  RCPT TO:<victim@evil.test>\r\n"));
        assert!(headers.contains("To: \"Ana  Bcc: victim@evil.test\" <ana@example.com>\r\n"));
    }

    #[test]
    fn non_ascii_headers_are_encoded_words() {
        let mail = Mail {
            to: "José <jose@example.com>".to_string(),
            subject: format!("Nova inscrição: {}", "café ".repeat(12)),
            text: "olá".to_string(),
        };
        let message = format_message("MeetApp <noreply@meetapp.com>", &mail, DATE).unwrap();
        let headers = headers(&message);
        assert!(headers.is_ascii());
        assert!(headers.contains(&format!("To: =?utf-8?B?{}?= <jose@example.com>", base64::encode("José"))));
        assert!(headers.contains("Subject: =?utf-8?B?"));
        // long subjects fold into several words
        assert!(headers.contains("?=\r\n =?utf-8?B?"));
        assert!(message.contains("\r\n\r\nolá\r\n.\r\n"));
    }

    /// Scripted SMTP peer. Replies `rcpt_reply` to RCPT TO and returns every
    /// line the client sent.
    async fn fake_server(listener: TcpListener, rcpt_reply: &'static str) -> Vec<String> {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        write.write_all(b"220 fake ESMTP\r\n").await.unwrap();

        let mut received = Vec::new();
        let mut in_data = false;
        let mut auth_step = 0;
        while let Some(line) = lines.next_line().await.unwrap() {
            received.push(line.clone());
            let reply: &str = if in_data {
                if line != "." {
                    continue;
                }
                in_data = false;
                "250 queued\r\n"
            } else if auth_step == 1 {
                auth_step = 2;
                "334 UGFzc3dvcmQ6\r\n"
            } else if auth_step == 2 {
                auth_step = 3;
                "235 authenticated\r\n"
            } else if line.starts_with("EHLO") {
                "250-fake greets you\r\n250 AUTH LOGIN\r\n"
            } else if line == "AUTH LOGIN" {
                auth_step = 1;
                "334 VXNlcm5hbWU6\r\n"
            } else if line.starts_with("RCPT TO") {
                rcpt_reply
            } else if line == "DATA" {
                in_data = true;
                "354 end with .\r\n"
            } else if line == "QUIT" {
                write.write_all(b"221 bye\r\n").await.unwrap();
                break;
            } else {
                "250 ok\r\n"
            };
            write.write_all(reply.as_bytes()).await.unwrap();
        }
        received
    }

    fn mailer(port: u16, auth: Option<MailAuth>, timeout: Duration) -> SmtpMailer {
        SmtpMailer::new(MailConfig {
            host: "127.0.0.1".to_string(),
            port,
            secure: false,
            auth,
            default_from: "MeetApp <noreply@meetapp.com>".to_string(),
            timeout,
        })
    }

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn delivers_through_smtp_dialogue() {
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(fake_server(listener, "250 ok\r\n"));

        let auth = MailAuth {
            user: "user".to_string(),
            pass: "pass".to_string(),
        };
        mailer(port, Some(auth), Duration::from_secs(5)).send(&mail()).await.unwrap();

        let received = server.await.unwrap();
        assert_eq!(received[0], "EHLO meetapp");
        assert_eq!(received[1], "AUTH LOGIN");
        assert_eq!(received[2], base64::encode("user"));
        assert_eq!(received[3], base64::encode("pass"));
        assert_eq!(received[4], "MAIL FROM:<noreply@meetapp.com>");
        assert_eq!(received[5], "RCPT TO:<ana@example.com>");
        assert_eq!(received[6], "DATA");
        assert!(received.contains(&"..hidden line".to_string()));
        assert_eq!(received.last().unwrap(), "QUIT");
    }

    #[tokio::test]
    async fn hostile_title_stays_inside_the_data_section() {
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(fake_server(listener, "250 ok\r\n"));

        mailer(port, None, Duration::from_secs(5)).send(&hostile_mail()).await.unwrap();

        let received = server.await.unwrap();
        let data = received.iter().position(|line| line == "DATA").unwrap();
        let end = received.iter().position(|line| line == ".").unwrap();
        let rcpt: Vec<&String> = received[..data]
            .iter()
            .filter(|line| line.starts_with("RCPT TO"))
            .collect();
        assert_eq!(rcpt, vec!["RCPT TO:<ana@example.com>"]);
        assert!(received[data..end].contains(&"..".to_string()));
        assert_eq!(received[end + 1..].to_vec(), vec!["QUIT".to_string()]);
    }

    #[tokio::test]
    async fn rejected_recipient_is_an_error() {
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(fake_server(listener, "550 no such user\r\n"));

        let err = mailer(port, None, Duration::from_secs(5)).send(&mail()).await.unwrap_err();
        match err {
            MailError::Rejected { code, text } => {
                assert_eq!(code, 550);
                assert_eq!(text, "no such user");
            }
            other => panic!("unexpected error: {other}"),
        }
        drop(server);
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let (listener, port) = local_listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let sent = time::timeout(
            Duration::from_secs(5),
            mailer(port, None, Duration::from_millis(200)).send(&mail()),
        )
        .await
        .expect("send must give up on its own");
        assert!(matches!(sent, Err(MailError::Timeout)));
        server.abort();
    }
}
