/*!
 * Ercscope RPC
 *
 * Cliente RPC para obtenção de bytecode implantado em nodes Ethereum
 */

use ercscope_core::{
    error::Result,
    traits::BytecodeFetcher,
    utils::{format_address, hex_to_address},
    Error, FetchOutcome,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use web3::{
    transports::{Http, WebSocket},
    Transport, Web3,
};

/// Configuração do cliente RPC
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// Tentativas extras após a primeira falha (0 mantém o comportamento sem retentativas)
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub use_cache: bool,
    pub cache_ttl: Duration,
    /// Bloco consultado em `eth_getCode`
    pub block_tag: String,
    /// Intervalo mínimo entre requisições ao node
    pub min_request_interval: Option<Duration>,
    /// Consulta `eth_blockNumber` na criação do cliente
    pub verify_connection: bool,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cloudflare-eth.com/".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 0,
            retry_delay: Duration::from_millis(500),
            use_cache: true,
            cache_ttl: Duration::from_secs(60),
            block_tag: "latest".to_string(),
            min_request_interval: None,
            verify_connection: true,
        }
    }
}

/// Enum para diferentes tipos de transporte
pub enum TransportType {
    Http(Web3<Http>),
    WebSocket(Web3<WebSocket>),
}

/// Cliente RPC para Ethereum
pub struct ErcscopeRpcClient {
    transport: TransportType,
    config: RpcConfig,
    cache: Arc<RwLock<HashMap<String, (FetchOutcome, Instant)>>>,
    last_request: tokio::sync::Mutex<Option<Instant>>,
}

impl ErcscopeRpcClient {
    /// Cria um novo cliente RPC HTTP
    pub async fn new_http(config: RpcConfig) -> Result<Self> {
        let transport = Http::new(&config.endpoint)
            .map_err(|e| Error::RpcError(format!("Falha ao conectar via HTTP: {}", e)))?;

        Self::connect(TransportType::Http(Web3::new(transport)), config).await
    }

    /// Cria um novo cliente RPC WebSocket
    pub async fn new_websocket(config: RpcConfig) -> Result<Self> {
        let transport = WebSocket::new(&config.endpoint)
            .await
            .map_err(|e| Error::RpcError(format!("Falha ao conectar via WebSocket: {}", e)))?;

        Self::connect(TransportType::WebSocket(Web3::new(transport)), config).await
    }

    /// Cria um novo cliente baseado na URL
    pub async fn new(config: RpcConfig) -> Result<Self> {
        if config.endpoint.starts_with("ws") {
            Self::new_websocket(config).await
        } else {
            Self::new_http(config).await
        }
    }

    async fn connect(transport: TransportType, config: RpcConfig) -> Result<Self> {
        let client = Self {
            transport,
            config,
            cache: Arc::new(RwLock::new(HashMap::new())),
            last_request: tokio::sync::Mutex::new(None),
        };

        // Verifica a conexão
        if client.config.verify_connection {
            let block = client.get_block_number().await.map_err(|e| {
                Error::RpcError(format!("Falha ao conectar ao node Ethereum: {}", e))
            })?;
            debug!(endpoint = %client.config.endpoint, block, "conectado ao node");
        }

        Ok(client)
    }

    /// Configuração em uso
    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Obtém o número do bloco atual
    pub async fn get_block_number(&self) -> Result<u64> {
        let value = self.execute("eth_blockNumber", Vec::new()).await?;
        let hex = value
            .as_str()
            .ok_or_else(|| Error::RpcError(format!("Resposta inesperada para eth_blockNumber: {}", value)))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| Error::RpcError(format!("Número de bloco inválido {}: {}", hex, e)))
    }

    /// Obtém o código de um contrato
    pub async fn get_code(&self, address: &str) -> Result<FetchOutcome> {
        let parsed = hex_to_address(address)
            .ok_or_else(|| Error::ValidationError(format!("Endereço inválido: {:?}", address)))?;
        let cache_key = format_address(&parsed);

        // Verifica o cache
        if self.config.use_cache {
            let cache = self.cache.read();
            if let Some((outcome, timestamp)) = cache.get(&cache_key) {
                if timestamp.elapsed() < self.config.cache_ttl {
                    debug!(address = %cache_key, "código obtido do cache");
                    return Ok(outcome.clone());
                }
            }
        }

        let params = vec![
            serde_json::Value::String(cache_key.clone()),
            serde_json::Value::String(self.config.block_tag.clone()),
        ];

        let mut attempt = 0;
        let value = loop {
            match self.execute("eth_getCode", params.clone()).await {
                Ok(value) => break value,
                Err(err) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(address = %cache_key, attempt, error = %err, "falha em eth_getCode, tentando novamente");
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        };

        let hex = value.as_str().ok_or_else(|| {
            Error::RpcError(format!("Resposta inesperada para eth_getCode: {}", value))
        })?;
        let outcome = FetchOutcome::from_hex(hex);
        debug!(address = %cache_key, empty = outcome.is_empty(), "código obtido");

        // Atualiza o cache
        if self.config.use_cache {
            let mut cache = self.cache.write();
            cache.insert(cache_key, (outcome.clone(), Instant::now()));
        }

        Ok(outcome)
    }

    /// Executa uma chamada JSON-RPC respeitando timeout e espaçamento entre requisições
    async fn execute(&self, method: &str, params: Vec<serde_json::Value>) -> Result<serde_json::Value> {
        self.throttle().await;

        match &self.transport {
            TransportType::Http(web3) => {
                self.with_timeout(method, web3.transport().execute(method, params)).await
            }
            TransportType::WebSocket(web3) => {
                self.with_timeout(method, web3.transport().execute(method, params)).await
            }
        }
    }

    async fn with_timeout<F>(&self, method: &str, fut: F) -> Result<serde_json::Value>
    where
        F: Future<Output = web3::Result<serde_json::Value>>,
    {
        tokio::time::timeout(self.config.timeout, fut)
            .await
            .map_err(|_| {
                Error::TimeoutError(format!("{} excedeu {:?}", method, self.config.timeout))
            })?
            .map_err(|e| Error::RpcError(format!("Falha em {}: {}", method, e)))
    }

    async fn throttle(&self) {
        let Some(interval) = self.config.min_request_interval else {
            return;
        };
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < interval {
                tokio::time::sleep(interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Implementação da trait BytecodeFetcher do ercscope-core
#[async_trait]
impl BytecodeFetcher for ErcscopeRpcClient {
    async fn fetch(&self, address: &str) -> Result<FetchOutcome> {
        self.get_code(address).await
    }
}
