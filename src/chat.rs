//! Assistant endpoint backing: proxies a user message to a chat-completion
//! API, seeding the system prompt with live chain data.

use anyhow::{Context, Result};
use serde_json::json;

use crate::eth::EthClient;

#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    pub async fn respond(&self, message: &str, live_context: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt(live_context) },
                { "role": "user", "content": message },
            ],
            "temperature": 0.7,
            "max_tokens": 500,
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("chat completion API returned {}", status);
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .context("chat completion response was not JSON")?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("Sorry, I could not generate a response.")
            .to_string();
        Ok(content)
    }
}

/// Live chain facts for the system prompt. RPC trouble degrades to a
/// placeholder line; the assistant still answers without them.
pub async fn live_chain_context(client: &EthClient) -> String {
    match tokio::try_join!(
        client.latest_block_number(),
        client.gas_price(),
        client.chain_id()
    ) {
        Ok((block, gas_price, chain_id)) => format!(
            "Current chain data:\n\
             - Latest block number: {}\n\
             - Current gas price: {} wei\n\
             - Chain id: {}",
            block, gas_price, chain_id
        ),
        Err(err) => {
            tracing::warn!("failed to fetch live chain data for chat: {}", err);
            "Unable to fetch current chain data.".to_string()
        }
    }
}

fn system_prompt(live_context: &str) -> String {
    format!(
        "You are the assistant of a blockchain explorer that tracks recent \
         blocks, whale transactions (transfers of 10,000 ETH and above, \
         tiered large/huge/mega), and rolling network analytics.\n\n\
         {}\n\n\
         Use the live chain data when relevant. Keep responses concise, \
         helpful, and accurate. Focus on blockchain topics; politely \
         redirect unrelated questions.",
        live_context
    )
}
