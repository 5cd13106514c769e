//! Deterministic in-memory chain.
//!
//! Understands exactly the SpeedH surface: creation of the twelve roles, the
//! wiring setters/accessors, `version()`, and the foal forge lifecycle. Every
//! other selector reverts. Foal rolls come from a seeded `ChaCha8Rng`, so a
//! given seed always produces the same foals.
//!
//! Creation code is [`SIMULATED_CODE_PREFIX`] followed by the role name; use
//! [`SimulatedChain::creation_code`] to build it.

use std::collections::{HashMap, HashSet};

use alloy_primitives::{keccak256, Address, Bytes, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use speedh_shared::{ContractRole, NativeAmount, ReferenceSlot};
use tracing::debug;

use super::{ChainBackend, TxDescriptor, TxHash, TxReceipt};
use crate::contracts::{
    reference_selectors, HorseshoeData, IFoalForge, ISpeedHContract, PerformanceStats,
};
use crate::error::{ChainError, ChainResult};
use crate::foal::FoalPricing;

/// Marker at the start of simulated creation code.
pub const SIMULATED_CODE_PREFIX: &[u8] = b"speedh-sim:";

const DEFAULT_ACCOUNTS: u8 = 4;
const INITIAL_BALANCE_WHOLE: u128 = 1_000_000;
const GAS_PRICE_WEI: u64 = 500_000_000_000;
const CREATE_GAS: u64 = 1_250_000;
const CALL_GAS: u64 = 48_000;
const BASE_TOTAL_POINTS: u64 = 120;
const EXTRA_POINTS_PER_PACKAGE: u64 = 10;

/// In-memory chain with node-managed accounts.
pub struct SimulatedChain {
    chain_id: u64,
    state: Mutex<SimState>,
}

struct SimState {
    block: u64,
    accounts: Vec<Address>,
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    contracts: HashMap<Address, SimContract>,
    receipts: HashMap<TxHash, PendingReceipt>,
    failing: HashSet<[u8; 4]>,
    inclusion_delay: u32,
    creations: usize,
    submissions: usize,
    rng: ChaCha8Rng,
    pricing: FoalPricing,
}

struct PendingReceipt {
    polls_left: u32,
    receipt: TxReceipt,
}

struct SimContract {
    role: ContractRole,
    owner: Address,
    version: String,
    references: HashMap<ReferenceSlot, Address>,
    minters: HashSet<Address>,
    balance: U256,
    foals: HashMap<Address, SimFoal>,
    claimed: HashMap<Address, u64>,
}

#[derive(Clone, Copy, Default)]
struct SimShoe {
    img_category: u64,
    img_number: u64,
    bonus: [u64; 8],
}

#[derive(Clone, Copy, Default)]
struct SimFoal {
    img_category: u64,
    img_number: u64,
    stats: [u64; 8],
    total_points: u64,
    extra_packages: u8,
    horseshoes: [SimShoe; 4],
}

impl SimulatedChain {
    /// Chain with four funded accounts, seeded by `chain_id`.
    #[must_use]
    pub fn new(chain_id: u64) -> Self {
        Self::with_seed(chain_id, chain_id)
    }

    /// Chain with four funded accounts and an explicit roll seed.
    #[must_use]
    pub fn with_seed(chain_id: u64, seed: u64) -> Self {
        let accounts: Vec<Address> = (0..DEFAULT_ACCOUNTS).map(derive_account).collect();
        let initial = NativeAmount::from_whole(INITIAL_BALANCE_WHOLE).to_u256();
        let balances = accounts.iter().map(|a| (*a, initial)).collect();
        Self {
            chain_id,
            state: Mutex::new(SimState {
                block: 0,
                accounts,
                balances,
                nonces: HashMap::new(),
                contracts: HashMap::new(),
                receipts: HashMap::new(),
                failing: HashSet::new(),
                inclusion_delay: 0,
                creations: 0,
                submissions: 0,
                rng: ChaCha8Rng::seed_from_u64(seed),
                pricing: FoalPricing::default(),
            }),
        }
    }

    /// Chain that exposes no signing accounts.
    #[must_use]
    pub fn without_accounts(chain_id: u64) -> Self {
        let chain = Self::new(chain_id);
        chain.state.lock().accounts.clear();
        chain
    }

    /// Creation code the simulator accepts for `role`.
    #[must_use]
    pub fn creation_code(role: ContractRole) -> Bytes {
        let mut code = SIMULATED_CODE_PREFIX.to_vec();
        code.extend_from_slice(role.name().as_bytes());
        code.into()
    }

    /// The `index`-th signing account.
    #[must_use]
    pub fn account(&self, index: usize) -> Option<Address> {
        self.state.lock().accounts.get(index).copied()
    }

    /// Sets an account balance.
    pub fn fund(&self, account: Address, wei: U256) {
        self.state.lock().balances.insert(account, wei);
    }

    /// Prices the forge enforces.
    pub fn set_pricing(&self, pricing: FoalPricing) {
        self.state.lock().pricing = pricing;
    }

    /// Receipts of transactions submitted from now on stay pending for `polls` polls.
    pub fn set_inclusion_delay(&self, polls: u32) {
        self.state.lock().inclusion_delay = polls;
    }

    /// Calls and transactions with `selector` revert.
    pub fn fail_selector(&self, selector: [u8; 4]) {
        self.state.lock().failing.insert(selector);
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        self.state.lock().failing.clear();
    }

    /// Overwrites a stored reference, bypassing ownership.
    pub fn override_reference(&self, contract: Address, slot: ReferenceSlot, value: Address) {
        if let Some(c) = self.state.lock().contracts.get_mut(&contract) {
            c.references.insert(slot, value);
        }
    }

    /// Overwrites a minter flag, bypassing ownership.
    pub fn override_minter(&self, contract: Address, minter: Address, enabled: bool) {
        if let Some(c) = self.state.lock().contracts.get_mut(&contract) {
            if enabled {
                c.minters.insert(minter);
            } else {
                c.minters.remove(&minter);
            }
        }
    }

    /// Overwrites the reported version string.
    pub fn override_version(&self, contract: Address, version: impl Into<String>) {
        if let Some(c) = self.state.lock().contracts.get_mut(&contract) {
            c.version = version.into();
        }
    }

    /// Role deployed at `address`.
    #[must_use]
    pub fn role_at(&self, address: Address) -> Option<ContractRole> {
        self.state.lock().contracts.get(&address).map(|c| c.role)
    }

    /// Contract-creation transactions submitted so far.
    #[must_use]
    pub fn creation_count(&self) -> usize {
        self.state.lock().creations
    }

    /// All transactions submitted so far.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.state.lock().submissions
    }

    /// Horses `owner` has claimed from the forge at `forge`.
    #[must_use]
    pub fn claimed_horses(&self, forge: Address, owner: Address) -> u64 {
        self.state
            .lock()
            .contracts
            .get(&forge)
            .and_then(|c| c.claimed.get(&owner).copied())
            .unwrap_or(0)
    }
}

#[async_trait]
impl ChainBackend for SimulatedChain {
    async fn chain_id(&self) -> ChainResult<u64> {
        Ok(self.chain_id)
    }

    async fn accounts(&self) -> ChainResult<Vec<Address>> {
        Ok(self.state.lock().accounts.clone())
    }

    async fn balance(&self, account: Address) -> ChainResult<U256> {
        Ok(self.state.lock().balance_of(account))
    }

    async fn call(&self, to: Address, data: Bytes) -> ChainResult<Bytes> {
        self.state
            .lock()
            .read(to, &data)
            .map(Bytes::from)
            .map_err(|message| ChainError::Revert { message })
    }

    async fn send_transaction(&self, from: Address, tx: &TxDescriptor) -> ChainResult<TxHash> {
        let mut state = self.state.lock();
        if !state.accounts.contains(&from) {
            return Err(ChainError::Rejected(format!("unknown account {from}")));
        }

        let gas = if tx.is_creation() { CREATE_GAS } else { CALL_GAS };
        let fee = U256::from(gas) * U256::from(GAS_PRICE_WEI);
        let balance = state.balance_of(from);
        if balance < fee.saturating_add(tx.value) {
            return Err(ChainError::Rejected(
                "insufficient funds for gas * price + value".to_string(),
            ));
        }

        let nonce = state.nonces.entry(from).or_insert(0);
        let current = *nonce;
        *nonce += 1;

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&current.to_be_bytes());
        preimage.extend_from_slice(&tx.data);
        let hash = keccak256(&preimage);

        state.block += 1;
        state.submissions += 1;
        state.balances.insert(from, balance - fee);

        let outcome = match tx.to {
            None => {
                state.creations += 1;
                state.create(from, current, &tx.data).map(Some)
            }
            Some(to) => state.execute(from, to, tx.value, &tx.data).map(|()| None),
        };
        let (success, contract_address) = match outcome {
            Ok(created) => (true, created),
            Err(reason) => {
                debug!(label = %tx.label, %reason, "simulated revert");
                (false, None)
            }
        };

        let receipt = TxReceipt {
            hash,
            success,
            gas_used: gas,
            contract_address,
            block_number: Some(state.block),
        };
        let polls_left = state.inclusion_delay;
        state
            .receipts
            .insert(hash, PendingReceipt { polls_left, receipt });
        Ok(hash)
    }

    async fn receipt(&self, hash: TxHash) -> ChainResult<Option<TxReceipt>> {
        let mut state = self.state.lock();
        let Some(pending) = state.receipts.get_mut(&hash) else {
            return Ok(None);
        };
        if pending.polls_left > 0 {
            pending.polls_left -= 1;
            return Ok(None);
        }
        Ok(Some(pending.receipt.clone()))
    }
}

impl SimState {
    fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or(U256::ZERO)
    }

    fn create(&mut self, from: Address, nonce: u64, code: &[u8]) -> Result<Address, String> {
        let name = code
            .strip_prefix(SIMULATED_CODE_PREFIX)
            .and_then(|rest| std::str::from_utf8(rest).ok())
            .ok_or_else(|| "creation code not understood by the simulator".to_string())?;
        let role = ContractRole::from_name(name)
            .ok_or_else(|| format!("unknown contract {name:?}"))?;

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        let address = Address::from_slice(&keccak256(&preimage)[12..]);

        self.contracts.insert(
            address,
            SimContract {
                role,
                owner: from,
                version: role.expected_version(),
                references: HashMap::new(),
                minters: HashSet::new(),
                balance: U256::ZERO,
                foals: HashMap::new(),
                claimed: HashMap::new(),
            },
        );
        Ok(address)
    }

    fn read(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, String> {
        let Some(contract) = self.contracts.get(&to) else {
            // Calls to empty accounts succeed with no data.
            return Ok(Vec::new());
        };
        let (selector, args) = split_selector(data)?;
        if self.failing.contains(&selector) {
            return Err("injected failure".to_string());
        }

        if selector == ISpeedHContract::versionCall::SELECTOR {
            return Ok(ISpeedHContract::versionCall::abi_encode_returns(&(
                contract.version.clone(),
            )));
        }
        if selector == ISpeedHContract::isHorseMinterCall::SELECTOR {
            let call = ISpeedHContract::isHorseMinterCall::abi_decode_raw(args, true)
                .map_err(|e| e.to_string())?;
            let enabled = contract.minters.contains(&call.minter);
            return Ok(ISpeedHContract::isHorseMinterCall::abi_encode_returns(&(
                enabled,
            )));
        }
        if let Some((slot, _, _)) = reference_selectors()
            .into_iter()
            .find(|(_, _, accessor)| *accessor == selector)
        {
            let stored = contract
                .references
                .get(&slot)
                .copied()
                .unwrap_or(Address::ZERO);
            return Ok(ISpeedHContract::contractStatsCall::abi_encode_returns(&(
                stored,
            )));
        }
        if contract.role == ContractRole::MinterFoalForge
            && selector == IFoalForge::getPendingHorseCall::SELECTOR
        {
            let call = IFoalForge::getPendingHorseCall::abi_decode_raw(args, true)
                .map_err(|e| e.to_string())?;
            let foal = contract.foals.get(&call.owner).copied().unwrap_or_default();
            return Ok(encode_pending(&foal));
        }
        Err("function selector not recognized".to_string())
    }

    fn execute(
        &mut self,
        from: Address,
        to: Address,
        value: U256,
        data: &[u8],
    ) -> Result<(), String> {
        let (selector, args) = split_selector(data)?;
        if self.failing.contains(&selector) {
            return Err("injected failure".to_string());
        }
        let pricing = self.pricing;
        let Self {
            contracts,
            rng,
            balances,
            ..
        } = self;
        let contract = contracts
            .get_mut(&to)
            .ok_or_else(|| "no contract at address".to_string())?;

        if selector == ISpeedHContract::setContractMinterCall::SELECTOR {
            require_owner_without_value(contract, from, value)?;
            let call = ISpeedHContract::setContractMinterCall::abi_decode_raw(args, true)
                .map_err(|e| e.to_string())?;
            if call.enabled {
                contract.minters.insert(call.minter);
            } else {
                contract.minters.remove(&call.minter);
            }
            return Ok(());
        }
        if let Some((slot, _, _)) = reference_selectors()
            .into_iter()
            .find(|(_, setter, _)| *setter == selector)
        {
            require_owner_without_value(contract, from, value)?;
            // Every setter takes a single address; decode with any of them.
            let call = ISpeedHContract::setContractStatsCall::abi_decode_raw(args, true)
                .map_err(|e| e.to_string())?;
            contract.references.insert(slot, call.target);
            return Ok(());
        }
        if contract.role != ContractRole::MinterFoalForge {
            return Err("function selector not recognized".to_string());
        }

        let price = if selector == IFoalForge::startHorseMintCall::SELECTOR {
            if contract.foals.contains_key(&from) {
                return Err("pending horse already exists".to_string());
            }
            require_exact_value(value, pricing.start_mint)?;
            contract.foals.insert(from, roll_foal(rng));
            value
        } else if selector == IFoalForge::randomizeHorseCall::SELECTOR {
            let call = IFoalForge::randomizeHorseCall::abi_decode_raw(args, true)
                .map_err(|e| e.to_string())?;
            require_exact_value(value, pricing.randomize)?;
            let foal = contract
                .foals
                .get_mut(&from)
                .ok_or_else(|| "no pending horse".to_string())?;
            reroll(foal, rng, call.keepImage, call.keepStats, call.keepShoes);
            value
        } else if selector == IFoalForge::buyExtraPointsCall::SELECTOR {
            require_exact_value(value, pricing.extra_points)?;
            let foal = contract
                .foals
                .get_mut(&from)
                .ok_or_else(|| "no pending horse".to_string())?;
            foal.extra_packages = foal.extra_packages.saturating_add(1);
            foal.total_points += EXTRA_POINTS_PER_PACKAGE;
            value
        } else if selector == IFoalForge::claimHorseCall::SELECTOR {
            if !value.is_zero() {
                return Err("claimHorse is not payable".to_string());
            }
            contract
                .foals
                .remove(&from)
                .ok_or_else(|| "no pending horse".to_string())?;
            *contract.claimed.entry(from).or_insert(0) += 1;
            U256::ZERO
        } else {
            return Err("function selector not recognized".to_string());
        };

        if !price.is_zero() {
            let payer = balances.entry(from).or_insert(U256::ZERO);
            *payer = payer.saturating_sub(price);
            contract.balance = contract.balance.saturating_add(price);
        }
        Ok(())
    }
}

fn split_selector(data: &[u8]) -> Result<([u8; 4], &[u8]), String> {
    if data.len() < 4 {
        return Err("calldata shorter than a selector".to_string());
    }
    let (head, args) = data.split_at(4);
    let mut selector = [0u8; 4];
    selector.copy_from_slice(head);
    Ok((selector, args))
}

fn require_owner_without_value(
    contract: &SimContract,
    from: Address,
    value: U256,
) -> Result<(), String> {
    if contract.owner != from {
        return Err(format!("caller {from} is not the owner"));
    }
    if !value.is_zero() {
        return Err("function is not payable".to_string());
    }
    Ok(())
}

fn require_exact_value(value: U256, price: NativeAmount) -> Result<(), String> {
    if value == price.to_u256() {
        Ok(())
    } else {
        Err(format!("expected {price} attached, got {value} wei"))
    }
}

fn derive_account(index: u8) -> Address {
    let seed = [b"speedh-sim-account:".as_slice(), &[index]].concat();
    Address::from_slice(&keccak256(seed)[12..])
}

fn roll_stats(rng: &mut ChaCha8Rng) -> [u64; 8] {
    let mut stats = [0u64; 8];
    for stat in &mut stats {
        *stat = rng.gen_range(5..=40);
    }
    stats
}

fn roll_shoes(rng: &mut ChaCha8Rng) -> [SimShoe; 4] {
    let populated = rng.gen_range(0..=2usize);
    let mut shoes = [SimShoe::default(); 4];
    for shoe in shoes.iter_mut().take(populated) {
        shoe.img_category = rng.gen_range(1..=3);
        shoe.img_number = rng.gen_range(1..=20);
        for bonus in &mut shoe.bonus {
            *bonus = rng.gen_range(0..=5);
        }
    }
    shoes
}

fn roll_foal(rng: &mut ChaCha8Rng) -> SimFoal {
    SimFoal {
        img_category: rng.gen_range(1..=5),
        img_number: rng.gen_range(1..=40),
        stats: roll_stats(rng),
        total_points: BASE_TOTAL_POINTS,
        extra_packages: 0,
        horseshoes: roll_shoes(rng),
    }
}

fn reroll(foal: &mut SimFoal, rng: &mut ChaCha8Rng, image: bool, stats: bool, shoes: bool) {
    if !image {
        foal.img_category = rng.gen_range(1..=5);
        foal.img_number = rng.gen_range(1..=40);
    }
    if !stats {
        foal.stats = roll_stats(rng);
    }
    if !shoes {
        foal.horseshoes = roll_shoes(rng);
    }
}

fn stats_to_abi(stats: &[u64; 8]) -> PerformanceStats {
    PerformanceStats {
        power: U256::from(stats[0]),
        acceleration: U256::from(stats[1]),
        stamina: U256::from(stats[2]),
        minSpeed: U256::from(stats[3]),
        maxSpeed: U256::from(stats[4]),
        luck: U256::from(stats[5]),
        curveBonus: U256::from(stats[6]),
        straightBonus: U256::from(stats[7]),
    }
}

fn encode_pending(foal: &SimFoal) -> Vec<u8> {
    let shoes = foal.horseshoes.map(|shoe| HorseshoeData {
        imgCategory: U256::from(shoe.img_category),
        imgNumber: U256::from(shoe.img_number),
        bonusStats: stats_to_abi(&shoe.bonus),
    });
    IFoalForge::getPendingHorseCall::abi_encode_returns(&(
        U256::from(foal.img_category),
        U256::from(foal.img_number),
        stats_to_abi(&foal.stats),
        U256::from(foal.total_points),
        foal.extra_packages,
        shoes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{submit_and_confirm, InclusionPolicy};
    use crate::contracts::decode_address_return;

    async fn deploy(chain: &SimulatedChain, role: ContractRole) -> Address {
        let deployer = chain.account(0).unwrap();
        let tx = TxDescriptor::create(role.name(), SimulatedChain::creation_code(role));
        submit_and_confirm(chain, deployer, &tx, InclusionPolicy::default())
            .await
            .unwrap()
            .contract_address
            .unwrap()
    }

    #[tokio::test]
    async fn test_creation_assigns_distinct_addresses() {
        let chain = SimulatedChain::new(31337);
        let a = deploy(&chain, ContractRole::Stats).await;
        let b = deploy(&chain, ContractRole::HayToken).await;
        assert_ne!(a, b);
        assert_eq!(chain.role_at(a), Some(ContractRole::Stats));
        assert_eq!(chain.creation_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_creation_code_reverts() {
        let chain = SimulatedChain::new(1);
        let deployer = chain.account(0).unwrap();
        let tx = TxDescriptor::create("junk", Bytes::from_static(b"\x60\x80"));
        let result = submit_and_confirm(&chain, deployer, &tx, InclusionPolicy::default()).await;
        assert!(matches!(result, Err(ChainError::Revert { .. })));
    }

    #[tokio::test]
    async fn test_setter_then_accessor() {
        let chain = SimulatedChain::new(1);
        let hub = deploy(&chain, ContractRole::Stats).await;
        let token = deploy(&chain, ContractRole::HayToken).await;
        let deployer = chain.account(0).unwrap();

        let data = crate::contracts::set_reference_calldata(ReferenceSlot::HayToken, token);
        let tx = TxDescriptor::call("wire", hub, "setContractHayToken(address)", data, U256::ZERO);
        submit_and_confirm(&chain, deployer, &tx, InclusionPolicy::default())
            .await
            .unwrap();

        let raw = chain
            .call(
                hub,
                crate::contracts::reference_accessor_calldata(ReferenceSlot::HayToken).into(),
            )
            .await
            .unwrap();
        assert_eq!(decode_address_return(&raw).unwrap(), token);
    }

    #[tokio::test]
    async fn test_non_owner_setter_reverts() {
        let chain = SimulatedChain::new(1);
        let hub = deploy(&chain, ContractRole::Stats).await;
        let player = chain.account(1).unwrap();
        let data = crate::contracts::set_reference_calldata(ReferenceSlot::HayToken, player);
        let tx = TxDescriptor::call("wire", hub, "setContractHayToken(address)", data, U256::ZERO);
        let result = submit_and_confirm(&chain, player, &tx, InclusionPolicy::default()).await;
        assert!(matches!(result, Err(ChainError::Revert { .. })));
    }

    #[tokio::test]
    async fn test_unknown_account_is_rejected() {
        let chain = SimulatedChain::new(1);
        let tx = TxDescriptor::create("x", SimulatedChain::creation_code(ContractRole::Stats));
        let result = chain.send_transaction(Address::repeat_byte(9), &tx).await;
        assert!(matches!(result, Err(ChainError::Rejected(_))));
        assert_eq!(chain.submission_count(), 0);
    }

    #[tokio::test]
    async fn test_inclusion_delay_hides_receipt() {
        let chain = SimulatedChain::new(1);
        chain.set_inclusion_delay(2);
        let deployer = chain.account(0).unwrap();
        let tx = TxDescriptor::create("x", SimulatedChain::creation_code(ContractRole::Stats));
        let hash = chain.send_transaction(deployer, &tx).await.unwrap();
        assert!(chain.receipt(hash).await.unwrap().is_none());
        assert!(chain.receipt(hash).await.unwrap().is_none());
        assert!(chain.receipt(hash).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fees_are_charged() {
        let chain = SimulatedChain::new(1);
        let deployer = chain.account(0).unwrap();
        let before = chain.balance(deployer).await.unwrap();
        deploy(&chain, ContractRole::Stats).await;
        let after = chain.balance(deployer).await.unwrap();
        assert_eq!(
            before - after,
            U256::from(CREATE_GAS) * U256::from(GAS_PRICE_WEI)
        );
    }
}
