//! Transactional email: the welcome message sent when a student is enrolled.

use chrono::{Datelike, Utc};
use lettre::{
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use minijinja::{Environment, context};
use sqlx::PgPool;
use std::path::Path;
use uuid::Uuid;

use crate::{
    config::{Config, EmailTransportConfig},
    db::{
        errors::DbError,
        handlers::{Courses, Repository, Users},
    },
    errors::Error,
    types::{CourseId, UserId},
};

const WELCOME_TEMPLATE: &str = include_str!("../templates/welcome.html");

/// Greeting used when the student has no name on file
const FALLBACK_NAME: &str = "there";

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
    reply_to: Option<String>,
    dashboard_url: String,
    support_url: String,
    templates: Environment<'static>,
}

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

/// A rendered message, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let email_config = &config.email;

        let transport = match &email_config.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                if !use_tls {
                    tracing::warn!("SMTP TLS is disabled - this is not recommended for production");
                }

                let smtp_builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                } else {
                    Ok(AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host))
                }
                .map_err(|e| Error::Internal {
                    operation: format!("create SMTP transport: {e}"),
                })?
                .port(*port)
                .credentials(Credentials::new(username.clone(), password.clone()));

                EmailTransport::Smtp(smtp_builder.build())
            }
            EmailTransportConfig::File { path } => {
                let emails_dir = Path::new(path);
                if !emails_dir.exists() {
                    std::fs::create_dir_all(emails_dir).map_err(|e| Error::Internal {
                        operation: format!("create emails directory: {e}"),
                    })?;
                }
                EmailTransport::File(AsyncFileTransport::<Tokio1Executor>::new(emails_dir))
            }
        };

        let mut templates = Environment::new();
        templates.add_template("welcome.html", WELCOME_TEMPLATE).map_err(|e| Error::Internal {
            operation: format!("load welcome email template: {e}"),
        })?;

        Ok(Self {
            transport,
            from_email: email_config.from_email.clone(),
            from_name: email_config.from_name.clone(),
            reply_to: email_config.reply_to.clone(),
            dashboard_url: config.frontend_link("/dashboard"),
            support_url: config.frontend_link(&email_config.support_path),
            templates,
        })
    }

    /// Subject and body of the welcome email for a course
    pub fn render_welcome(&self, full_name: Option<&str>, course_title: &str) -> Result<RenderedEmail, Error> {
        let name = full_name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(FALLBACK_NAME);

        let html = self
            .templates
            .get_template("welcome.html")
            .and_then(|template| {
                template.render(context! {
                    academy_name => &self.from_name,
                    name => name,
                    course_title => course_title,
                    dashboard_url => &self.dashboard_url,
                    support_url => &self.support_url,
                    year => Utc::now().year(),
                })
            })
            .map_err(|e| Error::Internal {
                operation: format!("render welcome email: {e}"),
            })?;

        Ok(RenderedEmail {
            subject: format!("Welcome to {course_title}! 🎉"),
            html,
        })
    }

    /// Send the welcome email. Returns the Message-ID of the sent message.
    #[tracing::instrument(skip(self, full_name), err)]
    pub async fn send_welcome_email(&self, to_email: &str, full_name: Option<&str>, course_title: &str) -> Result<String, Error> {
        let rendered = self.render_welcome(full_name, course_title)?;
        self.send_email(to_email, full_name, &rendered).await
    }

    async fn send_email(&self, to_email: &str, to_name: Option<&str>, email: &RenderedEmail) -> Result<String, Error> {
        let from = format!("{} <{}>", self.from_name, self.from_email)
            .parse::<Mailbox>()
            .map_err(|e| Error::Internal {
                operation: format!("parse from email: {e}"),
            })?;

        let to = match to_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("{name} <{to_email}>"),
            None => to_email.to_string(),
        }
        .parse::<Mailbox>()
        .map_err(|e| Error::Internal {
            operation: format!("parse to email: {e}"),
        })?;

        let domain = self.from_email.rsplit_once('@').map(|(_, d)| d).unwrap_or("localhost");
        let message_id = format!("<{}@{}>", Uuid::new_v4(), domain);

        let mut builder = Message::builder()
            .from(from)
            .to(to)
            .subject(email.subject.as_str())
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_HTML);

        if let Some(reply_to) = &self.reply_to {
            let reply_to = reply_to.parse::<Mailbox>().map_err(|e| Error::Internal {
                operation: format!("parse reply-to email: {e}"),
            })?;
            builder = builder.reply_to(reply_to);
        }

        let message = builder.body(email.html.clone()).map_err(|e| Error::Internal {
            operation: format!("build email message: {e}"),
        })?;

        match &self.transport {
            EmailTransport::Smtp(smtp) => {
                smtp.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send SMTP email: {e}"),
                })?;
            }
            EmailTransport::File(file) => {
                file.send(message).await.map_err(|e| Error::Internal {
                    operation: format!("send file email: {e}"),
                })?;
            }
        }

        Ok(message_id)
    }
}

/// Look up the student and course behind an enrollment and send them the welcome email.
///
/// Returns the Message-ID of the sent message.
#[tracing::instrument(skip(db, mailer), err)]
pub async fn send_enrollment_welcome(db: &PgPool, mailer: &EmailService, user_id: UserId, course_id: CourseId) -> Result<String, Error> {
    let mut conn = db.acquire().await.map_err(DbError::from)?;

    let user = Users::new(&mut conn)
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Profile".to_string(),
            id: user_id.to_string(),
        })?;
    let course = Courses::new(&mut conn)
        .get_by_id(course_id)
        .await?
        .ok_or_else(|| Error::NotFound {
            resource: "Course".to_string(),
            id: course_id.to_string(),
        })?;
    drop(conn);

    tracing::info!("Sending welcome email to {} for course {}", user.email, course.title);
    mailer.send_welcome_email(&user.email, user.full_name.as_deref(), &course.title).await
}
