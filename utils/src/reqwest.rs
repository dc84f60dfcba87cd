use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use url::Url;

use crate::serde::{SerdePathError, SerdeResponseParse};

#[derive(Debug)]
pub enum ReqwestStage {
    Send,
    Status,
    DecodeText,
    Deserialise,
}

fn parse_url<U: ToString>(url: U) -> crate::Result<Url> {
    url.to_string()
        .parse::<Url>()
        .map_err(|_| crate::Error::InvalidUrl(url.to_string()))
}

#[derive(Debug)]
#[allow(dead_code)]
pub struct ReqwestErrorContext {
    pub url: Url,
    query: String,
}

#[derive(Debug)]
pub enum ReqwestInnerError {
    Reqwest(reqwest::Error),
    SerdePath(SerdePathError),
}

impl ReqwestInnerError {
    pub fn is_connect(&self) -> bool {
        match self {
            Self::Reqwest(err) => err.is_connect(),
            Self::SerdePath(_) => false,
        }
    }
}

/// GET request builder that keeps enough context around to produce a useful
/// error for whichever stage of the request fails.
pub struct Reqwest {
    builder: RequestBuilder,
    error_context: Option<ReqwestErrorContext>,
}

impl Reqwest {
    pub fn get<U: ToString>(url: U) -> crate::Result<Self> {
        let url = parse_url(url)?;
        let client = reqwest::Client::new();
        let builder = client.get(url.clone());
        Ok(Self {
            builder,
            error_context: Some(ReqwestErrorContext {
                url,
                query: String::new(),
            }),
        })
    }

    pub fn query<T: serde::Serialize + Debug>(mut self, query: &T) -> Self {
        if let Some(context) = self.error_context.as_mut() {
            context.query = format!("{query:?}");
        }
        self.builder = self.builder.query(query);
        self
    }

    async fn receive_text_internal(mut self) -> crate::Result<(String, Box<ReqwestErrorContext>)> {
        let error_context = Box::new(
            self.error_context
                .take()
                .ok_or(crate::Error::ReqwestErrorContextMissing)?,
        );

        let send_result = self.builder.send().await;
        let response = match send_result {
            Ok(response) => response,
            Err(err) if err.is_connect() => return Err(crate::Error::Internet(error_context.url)),
            Err(err) => {
                return Err(crate::Error::ReqwestFailed {
                    stage: ReqwestStage::Send,
                    context: error_context,
                    inner: ReqwestInnerError::Reqwest(err),
                })
            }
        };

        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) => {
                return Err(crate::Error::ReqwestFailed {
                    stage: ReqwestStage::Status,
                    context: error_context,
                    inner: ReqwestInnerError::Reqwest(err),
                })
            }
        };

        match response.text().await {
            Ok(text) => Ok((text, error_context)),
            Err(err) => Err(crate::Error::ReqwestFailed {
                stage: ReqwestStage::DecodeText,
                context: error_context,
                inner: ReqwestInnerError::Reqwest(err),
            }),
        }
    }

    pub async fn receive_json<J: Debug + DeserializeOwned>(self) -> crate::Result<J> {
        let (text, error_context) = self.receive_text_internal().await?;

        match text.as_str().serde_parse_custom() {
            Ok(json) => Ok(json),
            Err(err) => Err(crate::Error::ReqwestFailed {
                stage: ReqwestStage::Deserialise,
                context: error_context,
                inner: ReqwestInnerError::SerdePath(err),
            }),
        }
    }
}
