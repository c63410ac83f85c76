//! Twitter search provider
//!
//! Implements `SearchProvider` over the `twitter-auth` HTTP calls. HTTP
//! failures are classified here so the polling core only ever sees
//! `PageResult` variants.

use credential_pool::classify_status;
use provider::{
    ClientCredentials, PageRequest, PageResult, ProviderError, ProviderFuture, QuerySpec,
    QuotaStatus, SearchProvider, Session,
};
use tracing::debug;
use twitter_auth::{Endpoints, SearchParams};

/// Application-only Twitter search over a shared HTTP client.
pub struct TwitterProvider {
    client: reqwest::Client,
    endpoints: Endpoints,
}

impl TwitterProvider {
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }
}

impl SearchProvider for TwitterProvider {
    fn id(&self) -> &str {
        "twitter"
    }

    fn authenticate<'a>(&'a self, credentials: &'a ClientCredentials) -> ProviderFuture<'a, Session> {
        Box::pin(async move {
            let token = twitter_auth::obtain_bearer_token(
                &self.client,
                &self.endpoints,
                &credentials.id,
                credentials.secret.expose(),
            )
            .await
            .map_err(provider_error)?;
            Ok(Session {
                credential_id: credentials.id.clone(),
                token: token.access_token.into(),
            })
        })
    }

    fn quota<'a>(&'a self, session: &'a Session) -> ProviderFuture<'a, QuotaStatus> {
        Box::pin(async move {
            let window = twitter_auth::search_rate_limit(
                &self.client,
                &self.endpoints,
                session.token.expose(),
            )
            .await
            .map_err(provider_error)?;
            Ok(QuotaStatus {
                limit: window.limit,
                remaining: window.remaining,
                reset_at: window.reset,
            })
        })
    }

    fn search<'a>(
        &'a self,
        session: &'a Session,
        query: &'a QuerySpec,
        page: PageRequest,
    ) -> ProviderFuture<'a, PageResult> {
        Box::pin(async move {
            let params = SearchParams {
                q: query.search_terms.as_deref(),
                tweet_mode: query.result_format.as_str(),
                count: query.page_size,
                lang: query.language.as_deref(),
                max_id: page.max_id,
                since_id: page.since_id,
                geocode: query.geocode.as_deref(),
            };

            match twitter_auth::search_tweets(
                &self.client,
                &self.endpoints,
                session.token.expose(),
                &params,
            )
            .await
            {
                Ok(records) => Ok(PageResult::Page(records)),
                Err(twitter_auth::Error::Status { status, body }) => match classify_status(status) {
                    Some(classification) => {
                        debug!(status, classification = classification.label(), "search failed");
                        Ok(PageResult::from_classification(
                            classification,
                            format!("{status}: {body}"),
                        ))
                    }
                    None => Err(ProviderError::Unclassified {
                        status,
                        message: body,
                    }),
                },
                Err(e) => Err(provider_error(e)),
            }
        })
    }
}

/// Map a `twitter-auth` error that was not classified as a page outcome.
fn provider_error(err: twitter_auth::Error) -> ProviderError {
    match err {
        twitter_auth::Error::InvalidCredentials(message)
        | twitter_auth::Error::TokenExchange(message) => ProviderError::Auth(message),
        twitter_auth::Error::Http(message) => ProviderError::Transport(message),
        twitter_auth::Error::Decode(message) => ProviderError::Decode(message),
        twitter_auth::Error::Status { status, body } => ProviderError::Unclassified {
            status,
            message: body,
        },
    }
}
