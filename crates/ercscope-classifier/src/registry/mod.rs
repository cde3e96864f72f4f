use ercscope_core::{
    error::Result,
    utils::strip_0x,
    Error, EventEntry, FunctionEntry, InterfaceSignature,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

/// Signatures checked when the caller does not name any.
pub const DEFAULT_SIGNATURES: &[&str] = &["ERC20", "ERC721", "ERC1155"];

struct BuiltinSignature {
    name: &'static str,
    functions: &'static [&'static str],
    events: &'static [&'static str],
}

const BUILTIN: &[BuiltinSignature] = &[
    BuiltinSignature {
        name: "ERC20",
        functions: &[
            "allowance(address,address)",
            "approve(address,uint256)",
            "balanceOf(address)",
            "totalSupply()",
            "transfer(address,uint256)",
            "transferFrom(address,address,uint256)",
        ],
        events: &[
            "Approval(address,address,uint256)",
            "Transfer(address,address,uint256)",
        ],
    },
    BuiltinSignature {
        name: "ERC721",
        functions: &[
            "approve(address,uint256)",
            "balanceOf(address)",
            "getApproved(uint256)",
            "isApprovedForAll(address,address)",
            "ownerOf(uint256)",
            "safeTransferFrom(address,address,uint256)",
            "safeTransferFrom(address,address,uint256,bytes)",
            "setApprovalForAll(address,bool)",
            "supportsInterface(bytes4)",
            "transferFrom(address,address,uint256)",
        ],
        events: &[
            "Approval(address,address,uint256)",
            "ApprovalForAll(address,address,bool)",
            "Transfer(address,address,uint256)",
        ],
    },
    BuiltinSignature {
        name: "ERC1155",
        functions: &[
            "balanceOf(address,uint256)",
            "balanceOfBatch(address[],uint256[])",
            "isApprovedForAll(address,address)",
            "safeBatchTransferFrom(address,address,uint256[],uint256[],bytes)",
            "safeTransferFrom(address,address,uint256,uint256,bytes)",
            "setApprovalForAll(address,bool)",
            "supportsInterface(bytes4)",
        ],
        events: &[
            "ApprovalForAll(address,address,bool)",
            "TransferBatch(address,address,address,uint256[],uint256[])",
            "TransferSingle(address,address,address,uint256,uint256)",
            "URI(string,uint256)",
        ],
    },
    BuiltinSignature {
        name: "ERC165",
        functions: &["supportsInterface(bytes4)"],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC173",
        functions: &["owner()", "supportsInterface(bytes4)", "transferOwnership(address)"],
        events: &["OwnershipTransferred(address,address)"],
    },
    BuiltinSignature {
        name: "ERC777",
        functions: &[
            "name()",
            "symbol()",
            "totalSupply()",
            "balanceOf(address)",
            "send(address,uint256,bytes)",
            "transfer(address,uint256)",
            "authorizeOperator(address)",
            "revokeOperator(address)",
            "isOperatorFor(address,address)",
            "operatorSend(address,address,uint256,bytes,bytes)",
            "burn(uint256,bytes)",
            "operatorBurn(address,uint256,bytes,bytes)",
            "granularity()",
        ],
        events: &[
            "Sent(address,address,address,uint256,bytes,bytes)",
            "Minted(address,address,uint256,bytes,bytes)",
            "Burned(address,address,uint256,bytes,bytes)",
            "AuthorizedOperator(address,address)",
            "RevokedOperator(address,address)",
        ],
    },
    BuiltinSignature {
        name: "ERC2981",
        functions: &["royaltyInfo(uint256,uint256)"],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC223",
        functions: &["transfer(address,uint256,bytes)", "tokenReceived(address,uint256,bytes)"],
        events: &["Transfer(address,address,uint256,bytes)"],
    },
    BuiltinSignature {
        name: "ERC884",
        functions: &[
            "getCurrentFor(address)",
            "isSuperseded(address)",
            "holderAt(uint256)",
            "holderCount()",
            "isVerified(address)",
            "isHolder(address)",
            "hasHash(address,bytes32)",
            "addVerified(address,bytes32)",
            "removeVerified(address)",
            "updateVerified(address,bytes32)",
            "cancelAndReissue(address,address)",
        ],
        events: &[
            "VerifiedAddressAdded(address,bytes32)",
            "VerifiedAddressRemoved(address)",
            "VerifiedAddressUpdated(address,bytes32)",
            "HolderAdded(address)",
            "HolderRemoved(address)",
        ],
    },
    BuiltinSignature {
        name: "ERC998",
        functions: &[
            "transferChild(uint256,address,uint256)",
            "safeTransferChild(uint256,address,uint256,bytes)",
            "transferChildToParent(address,uint256,address,uint256,uint256,bytes)",
            "getChild(address,uint256,address,uint256)",
            "safeTransferChild(uint256,address,address,uint256)",
            "onERC721Received(address,address,uint256,bytes)",
            "ownerOfChild(address,uint256)",
            "childContractByIndex(uint256,uint256)",
            "childTokenByIndex(uint256,uint256)",
            "rootOwnerOfChild(address,uint256)",
            "rootOwnerOf(uint256)",
        ],
        events: &[
            "TransferChild(uint256,address,uint256)",
            "ReceivedChild(address,uint256,address,uint256)",
        ],
    },
    BuiltinSignature {
        name: "ERC1363",
        functions: &[
            "transferAndCall(address,uint256)",
            "transferAndCall(address,uint256,bytes)",
            "transferFromAndCall(address,address,uint256)",
            "transferFromAndCall(address,address,uint256,bytes)",
            "approveAndCall(address,uint256)",
            "approveAndCall(address,uint256,bytes)",
            "onTransferReceived(address,address,uint256,bytes)",
            "onApprovalReceived(address,uint256,bytes)",
        ],
        events: &["Transfer(address,address,uint256)", "Approval(address,address,uint256)"],
    },
    BuiltinSignature {
        name: "ERC875",
        functions: &[
            "name()",
            "symbol()",
            "balanceOf(address)",
            "transfer(address,uint256[])",
            "transferFrom(address,address,uint256[])",
            "totalSupply()",
            "ownerOf(uint256)",
            "trade(uint256,uint256[],uint8,bytes32,bytes32)",
        ],
        events: &[
            "Transfer(address,address,uint256[])",
            "Trade(uint256,uint256[],uint8,bytes32,bytes32)",
        ],
    },
    BuiltinSignature {
        name: "ERC1046",
        functions: &["tokenURI()"],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC2612",
        functions: &[
            "permit(address,address,uint256,uint256,uint8,bytes32,bytes32)",
            "nonces(address)",
            "DOMAIN_SEPARATOR()",
        ],
        events: &["Permit(address,address,uint256,uint256,uint8,bytes32,bytes32)"],
    },
    BuiltinSignature {
        name: "ERC1948",
        functions: &["readData(uint256)", "writeData(uint256,bytes)"],
        events: &["DataUpdated(uint256,bytes)"],
    },
    BuiltinSignature {
        name: "ERC1261",
        functions: &[
            "addMember(address,uint256[])",
            "revokeMembership(address)",
            "getMemberRoles(address)",
            "isMember(address)",
            "name()",
            "symbol()",
        ],
        events: &["MemberAdded(address,uint256[])", "MembershipRevoked(address)"],
    },
    BuiltinSignature {
        name: "ERC1337",
        functions: &[
            "modifyStatus(uint256,uint8,bytes)",
            "executeSubscription(address,uint256,bytes,uint8,uint256,uint256,uint256,address,bytes,bytes)",
            "isValidSubscription(uint256)",
            "getSubscriptionStatus(uint256)",
            "getSubscriptionHash(address,uint256,bytes,uint8,uint256,uint256,uint256,address,bytes)",
            "getModifyStatusHash(bytes32,uint8)",
        ],
        events: &[
            "SubscriptionExecuted(address,uint256,bytes,uint8,uint256,uint256,uint256,address,bytes,bytes)",
            "StatusModified(uint256,uint8,bytes)",
        ],
    },
    BuiltinSignature {
        name: "ERC2021",
        functions: &[
            "orderPayoutFrom(string,address,uint256,string)",
            "orderPayout(string,uint256,string)",
            "authorizePayoutOperator(address)",
            "revokePayoutOperator(address)",
            "cancelPayout(string)",
            "processPayout(string)",
            "putFundsInSuspenseInPayout(string)",
            "executePayout(string)",
            "rejectPayout(string,string)",
            "isPayoutOperatorFor(address,address)",
            "retrievePayoutData(string)",
        ],
        events: &[
            "PayoutOrdered(string,address,uint256,string)",
            "PayoutProcessed(string)",
            "PayoutExecuted(string)",
            "PayoutRejected(string,string)",
        ],
    },
    BuiltinSignature {
        name: "ERC2018",
        functions: &[
            "orderTransfer(string,address,uint256)",
            "orderTransferFrom(string,address,address,uint256)",
            "authorizeClearableTransferOperator(address)",
            "revokeClearableTransferOperator(address)",
            "cancelTransfer(string)",
            "processClearableTransfer(string)",
            "executeClearableTransfer(string)",
            "rejectClearableTransfer(string,string)",
            "retrieveClearableTransferData(string)",
            "isClearableTransferOperatorFor(address,address)",
        ],
        events: &[
            "TransferOrdered(string,address,uint256)",
            "TransferProcessed(string)",
            "TransferExecuted(string)",
            "TransferRejected(string,string)",
        ],
    },
    BuiltinSignature {
        name: "ERC2019",
        functions: &[
            "authorizeFundOperator(address)",
            "revokeFundOperator(address)",
            "orderFund(string,uint256,string)",
            "orderFundFrom(string,address,uint256,string)",
            "cancelFund(string)",
            "processFund(string)",
            "executeFund(string)",
            "rejectFund(string,string)",
            "isFundOperatorFor(address,address)",
            "retrieveFundData(address,string)",
        ],
        events: &[
            "FundOrdered(string,uint256,string)",
            "FundProcessed(string)",
            "FundExecuted(string)",
            "FundRejected(string,string)",
        ],
    },
    BuiltinSignature {
        name: "ERC1996",
        functions: &[
            "hold(string,address,address,uint256,uint256)",
            "holdFrom(string,address,address,address,uint256,uint256)",
            "releaseHold(string)",
            "executeHold(string,uint256)",
            "renewHold(string,uint256)",
            "retrieveHoldData(string)",
            "balanceOnHold(address)",
            "netBalanceOf(address)",
            "totalSupplyOnHold()",
            "authorizeHoldOperator(address)",
            "revokeHoldOperator(address)",
            "isHoldOperatorFor(address,address)",
        ],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC2020",
        functions: &[
            "currency()",
            "version()",
            "availableFunds(address)",
            "checkTransferAllowed(address,address,uint256)",
            "checkApproveAllowed(address,address,uint256)",
            "checkHoldAllowed(address,address,address,uint256)",
            "checkAuthorizeHoldOperatorAllowed(address,address)",
            "checkOrderTransferAllowed(address,address,uint256)",
            "checkAuthorizeClearableTransferOperatorAllowed(address,address)",
            "checkOrderFundAllowed(address,address,uint256)",
            "checkAuthorizeFundOperatorAllowed(address,address)",
            "checkOrderPayoutAllowed(address,address,uint256)",
            "checkAuthorizePayoutOperatorAllowed(address,address)",
        ],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC3135",
        functions: &[
            "iconUrl()",
            "issuer()",
            "claim(address,uint256,uint256,bytes)",
            "transferIssuer(address)",
            "deposit(uint256)",
            "withdraw(address,uint256)",
            "depositBalanceOf(address)",
        ],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC3440",
        functions: &[
            "signArtwork(uint256,bytes)",
            "getSignature(uint256)",
            "verifySignature(uint256,bytes)",
            "setEditionLimit(uint256,uint256)",
            "getEditionLimit(uint256)",
            "markAsOriginal(uint256)",
            "isOriginal(uint256)",
            "setArtist(address)",
            "getArtist(uint256)",
        ],
        events: &["ArtworkSigned(uint256,address,bytes)"],
    },
    BuiltinSignature {
        name: "ERC3589",
        functions: &[
            "hash(uint256,address[],uint256[])",
            "mint(address,address[],uint256[])",
            "safeMint(address,address[],uint256[])",
            "burn(address,uint256,uint256,address[],uint256[])",
        ],
        events: &["AssemblyTokenMinted(uint256,address,address[],uint256[])"],
    },
    BuiltinSignature {
        name: "ERC3754",
        functions: &[
            "balanceOf(address)",
            "ownerOf(uint256)",
            "approve(address,uint256)",
            "getApproved(uint256)",
            "setApprovalForAll(address,bool)",
            "isApprovedForAll(address,address)",
            "transferFrom(address,address,uint256)",
            "safeTransferFrom(address,address,uint256)",
            "safeTransferFrom(address,address,uint256,bytes)",
        ],
        events: &[
            "Transfer(address,address,uint256)",
            "Approval(address,address,uint256)",
            "ApprovalForAll(address,address,bool)",
        ],
    },
    BuiltinSignature {
        name: "ERC4494",
        functions: &["permit(address,uint256,uint256,uint8,bytes32,bytes32)"],
        events: &[],
    },
    BuiltinSignature {
        name: "ERC4524",
        functions: &[
            "safeTransfer(address,uint256)",
            "safeTransfer(address,uint256,bytes)",
            "safeTransferFrom(address,address,uint256)",
            "safeTransferFrom(address,address,uint256,bytes)",
            "onERC20Received(address,address,uint256,bytes)",
        ],
        events: &["Transfer(address,address,uint256)"],
    },
    BuiltinSignature {
        name: "ERC4675",
        functions: &[
            "transfer(address,uint256,uint256)",
            "approve(address,uint256,uint256)",
            "transferFrom(address,address,uint256,uint256)",
            "setParentNFT(address,uint256,uint256)",
            "totalSupply(uint256)",
            "balanceOf(address,uint256)",
            "allowance(address,address,uint256)",
            "isRegistered(address,uint256)",
            "onERC721Received(address,address,uint256,bytes)",
        ],
        events: &[
            "Transfer(address,address,uint256,uint256)",
            "Approval(address,address,uint256,uint256)",
            "ParentNFTRegistered(address,uint256,uint256)",
        ],
    },
];

/// Entry of a JSON registry file, in the `erc_config.json` layout.
#[derive(Debug, Deserialize)]
struct RegistryEntry {
    #[serde(default)]
    selectors: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    /// function signature -> selector
    #[serde(default)]
    functions: BTreeMap<String, String>,
    /// topic -> "event Signature(...)"
    #[serde(default)]
    events: BTreeMap<String, String>,
}

/// Named interface signatures available to the classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    signatures: Vec<InterfaceSignature>,
}

impl Registry {
    pub fn new(signatures: Vec<InterfaceSignature>) -> Self {
        Self { signatures }
    }

    /// Registry compiled into the binary.
    pub fn builtin() -> Self {
        let signatures = BUILTIN
            .iter()
            .map(|b| InterfaceSignature::from_signatures(b.name, b.functions, b.events))
            .collect();
        Self { signatures }
    }

    /// Loads a registry from JSON text.
    ///
    /// Entries are keyed by name and sorted by it. When an entry carries a
    /// `functions` map the signatures are kept, otherwise the bare `selectors`
    /// list is used.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, RegistryEntry> = serde_json::from_str(text)
            .map_err(|e| Error::ValidationError(format!("invalid registry JSON: {}", e)))?;

        let mut signatures = Vec::with_capacity(raw.len());
        for (name, entry) in raw {
            signatures.push(parse_entry(name, entry)?);
        }
        Ok(Self { signatures })
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Adds or replaces signatures by name, ignoring ASCII case.
    pub fn merge(&mut self, other: Registry) {
        for sig in other.signatures {
            match self
                .signatures
                .iter_mut()
                .find(|s| s.name.eq_ignore_ascii_case(&sig.name))
            {
                Some(existing) => *existing = sig,
                None => self.signatures.push(sig),
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&InterfaceSignature> {
        self.signatures.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&str> {
        self.signatures.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn signatures(&self) -> &[InterfaceSignature] {
        &self.signatures
    }

    /// Picks the named signatures, in the order requested.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<InterfaceSignature>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).cloned().ok_or_else(|| {
                    Error::ValidationError(format!(
                        "unknown signature {}; known: {}",
                        name,
                        self.names().join(", ")
                    ))
                })
            })
            .collect()
    }

    /// Serializes the registry in the `erc_config.json` layout.
    pub fn to_config_json(&self) -> Value {
        let mut root = Map::new();
        for sig in &self.signatures {
            let selectors: Vec<String> = sig.selectors().map(hex::encode).collect();
            let topics: Vec<String> = sig.topics().map(|t| format!("0x{}", hex::encode(t))).collect();
            let functions: Map<String, Value> = sig
                .functions
                .iter()
                .filter_map(|f| {
                    f.signature
                        .as_ref()
                        .map(|s| (s.clone(), Value::String(hex::encode(f.selector))))
                })
                .collect();
            let events: Map<String, Value> = sig
                .events
                .iter()
                .filter_map(|e| {
                    e.signature.as_ref().map(|s| {
                        (format!("0x{}", hex::encode(e.topic)), Value::String(format!("event {}", s)))
                    })
                })
                .collect();
            root.insert(
                sig.name.clone(),
                json!({
                    "selectors": selectors,
                    "topics": topics,
                    "functions": functions,
                    "events": events,
                }),
            );
        }
        Value::Object(root)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn parse_entry(name: String, entry: RegistryEntry) -> Result<InterfaceSignature> {
    let functions = if entry.functions.is_empty() {
        entry
            .selectors
            .iter()
            .map(|s| {
                Ok(FunctionEntry { signature: None, selector: parse_fixed::<4>(&name, s)? })
            })
            .collect::<Result<Vec<_>>>()?
    } else {
        entry
            .functions
            .iter()
            .map(|(sig, s)| {
                Ok(FunctionEntry { signature: Some(sig.clone()), selector: parse_fixed::<4>(&name, s)? })
            })
            .collect::<Result<Vec<_>>>()?
    };

    // Topics that are not 32 bytes of hex are dropped; the entry keeps its selectors.
    let events = entry
        .topics
        .iter()
        .filter_map(|t| match parse_fixed::<32>(&name, t) {
            Ok(topic) => {
                let signature = entry
                    .events
                    .get(t)
                    .map(|e| e.trim_start_matches("event ").to_string());
                Some(EventEntry { signature, topic })
            }
            Err(err) => {
                warn!(signature = %name, error = %err, "ignoring malformed event topic");
                None
            }
        })
        .collect();

    Ok(InterfaceSignature { name, functions, events })
}

fn parse_fixed<const N: usize>(name: &str, hex_str: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(strip_0x(hex_str.trim())).map_err(|e| {
        Error::ValidationError(format!("{}: invalid hex {:?}: {}", name, hex_str, e))
    })?;
    bytes.try_into().map_err(|_| {
        Error::ValidationError(format!("{}: {:?} is not {} bytes long", name, hex_str, N))
    })
}
