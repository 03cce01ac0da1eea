//! [`IndexerReader`] over the Livepeer subgraph's GraphQL endpoint.

use alloy_primitives::{hex, Address};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::errors::LookupError;
use crate::reader::IndexerReader;
use crate::types::{BlockNumber, IndexedPoll, ReportedTally, Vote, VoteChoice};

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    data: Option<PollData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct PollData {
    poll: Option<RawPoll>,
}

#[derive(Debug, Deserialize)]
struct RawPoll {
    tally: Option<ReportedTally>,
    #[serde(default)]
    votes: Vec<RawVote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVote {
    id: String,
    voter: String,
    #[serde(rename = "choiceID")]
    choice_id: String,
    #[serde(default)]
    registered_transcoder: Option<bool>,
}

impl RawVote {
    fn normalize(self) -> Result<Vote, LookupError> {
        let voter: Address = self
            .voter
            .parse()
            .map_err(|err| LookupError::Malformed(format!("voter {:?}: {err}", self.voter)))?;
        let choice: VoteChoice = self
            .choice_id
            .parse()
            .map_err(|err| LookupError::Malformed(format!("vote by {voter}: {err}")))?;
        Ok(Vote::new(voter, choice, self.registered_transcoder.unwrap_or(false)))
    }
}

/// Largest `first:` the hosted subgraph accepts.
pub const VOTES_PAGE_SIZE: usize = 1000;

/// GraphQL document for a poll's tally and one page of its votes as of
/// block `at`, starting after vote id `after` (`""` for the first page).
pub fn poll_query(poll: Address, at: BlockNumber, after: &str) -> String {
    format!(
        r#"{{
  poll(block: {{number: {at}}}, id: "{id}") {{
    tally {{
      yes
      no
    }}
    votes(first: {VOTES_PAGE_SIZE}, orderBy: id, orderDirection: asc, where: {{id_gt: {after:?}}}) {{
      id
      voter
      choiceID
      registeredTranscoder
    }}
  }}
}}"#,
        id = hex::encode_prefixed(poll),
    )
}

/// Walks the vote list page by page with an `id_gt` cursor.
///
/// A page shorter than [`VOTES_PAGE_SIZE`] ends the walk. The tally is taken
/// from the first page.
#[derive(Debug)]
pub(crate) struct PollPager {
    poll: Address,
    tally: Option<ReportedTally>,
    votes: Vec<Vote>,
    cursor: String,
    done: bool,
}

impl PollPager {
    pub(crate) fn new(poll: Address) -> Self {
        Self {
            poll,
            tally: None,
            votes: Vec::new(),
            cursor: String::new(),
            done: false,
        }
    }

    /// Query for the next page, or `None` once the list is complete.
    pub(crate) fn next_query(&self, at: BlockNumber) -> Option<String> {
        (!self.done).then(|| poll_query(self.poll, at, &self.cursor))
    }

    pub(crate) fn absorb(&mut self, response: GraphQlResponse) -> Result<(), LookupError> {
        if !response.errors.is_empty() {
            let messages: Vec<String> = response.errors.into_iter().map(|e| e.message).collect();
            return Err(LookupError::Query(messages.join("; ")));
        }
        let raw = response
            .data
            .and_then(|data| data.poll)
            .ok_or_else(|| LookupError::NotFound(format!("poll {} is not indexed", self.poll)))?;

        if self.tally.is_none() {
            self.tally = Some(raw.tally.unwrap_or_default());
        }

        let page_len = raw.votes.len();
        let last_id = raw.votes.last().map(|vote| vote.id.clone());
        for vote in raw.votes {
            self.votes.push(vote.normalize()?);
        }

        match last_id {
            Some(last) if page_len >= VOTES_PAGE_SIZE => {
                if last == self.cursor {
                    return Err(LookupError::Malformed(format!(
                        "vote page cursor did not advance past {:?}",
                        self.cursor
                    )));
                }
                debug!(poll = %self.poll, votes = self.votes.len(), "fetching next vote page");
                self.cursor = last;
            }
            _ => self.done = true,
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> IndexedPoll {
        IndexedPoll {
            tally: self.tally.unwrap_or_default(),
            votes: self.votes,
        }
    }
}

pub struct SubgraphIndexer {
    http: reqwest::Client,
    url: String,
}

impl SubgraphIndexer {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl IndexerReader for SubgraphIndexer {
    async fn poll_snapshot(
        &self,
        poll: Address,
        at: BlockNumber,
    ) -> Result<IndexedPoll, LookupError> {
        let mut pager = PollPager::new(poll);
        while let Some(query) = pager.next_query(at) {
            let response: GraphQlResponse = self
                .http
                .post(&self.url)
                .json(&json!({ "query": query }))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            pager.absorb(response)?;
        }
        Ok(pager.finish())
    }
}
