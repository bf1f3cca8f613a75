//! Conversions between domain types and their wire representations.

use baronbft_proto::canonical::{CanonicalBlockId, CanonicalPartSetHeader};
use baronbft_proto::{self as proto, Error, Protobuf, SignedMsgType};

use crate::{
    Address, Block, BlockId, BlockMeta, Commit, CommitSig, Hash, Header, Height, PartSetHeader,
    Proposal, Round, Signature, Timestamp, Transaction, Vote, VoteType,
};

//----------------------------------------
// Helpers shared across conversions

/// Canonical form of a block id: a zero-hash id collapses to nil (absent),
/// discarding any part-set header, so signatures stay portable.
pub(crate) fn canonical_block_id(block_id: &BlockId) -> Option<CanonicalBlockId> {
    if block_id.hash.is_none() {
        return None;
    }

    Some(CanonicalBlockId {
        hash: block_id.hash.to_vec(),
        part_set_header: Some(CanonicalPartSetHeader {
            total: block_id.part_set_header.total,
            hash: block_id.part_set_header.hash.to_vec(),
        }),
    })
}

pub(crate) fn timestamp_to_proto(timestamp: &Timestamp) -> proto::types::Timestamp {
    proto::types::Timestamp {
        seconds: timestamp.unix_seconds(),
        nanos: timestamp.subsec_nanos() as i32,
    }
}

fn timestamp_from_proto(
    timestamp: Option<proto::types::Timestamp>,
    type_name: &'static str,
) -> Result<Timestamp, Error> {
    let timestamp = timestamp.ok_or_else(|| Error::missing_field(type_name, "timestamp"))?;

    let nanos = u32::try_from(timestamp.nanos)
        .map_err(|_| Error::invalid_field(type_name, "timestamp", "negative nanos"))?;

    Timestamp::from_unix_parts(timestamp.seconds, nanos)
        .map_err(|e| Error::invalid_field(type_name, "timestamp", e))
}

fn hash_from_proto(bytes: &[u8], type_name: &'static str, field: &'static str) -> Result<Hash, Error> {
    Hash::from_bytes(bytes).map_err(|e| Error::invalid_field(type_name, field, e))
}

fn address_from_proto(
    bytes: &[u8],
    type_name: &'static str,
    field: &'static str,
) -> Result<Address, Error> {
    Address::from_bytes(bytes).map_err(|e| Error::invalid_field(type_name, field, e))
}

fn signature_from_proto(
    bytes: &[u8],
    type_name: &'static str,
) -> Result<Signature, Error> {
    Signature::from_bytes(bytes).map_err(|e| Error::invalid_field(type_name, "signature", e))
}

pub(crate) fn block_id_to_proto(block_id: &BlockId) -> proto::BlockId {
    proto::BlockId {
        hash: block_id.hash.to_vec(),
        part_set_header: Some(proto::PartSetHeader {
            total: block_id.part_set_header.total,
            hash: block_id.part_set_header.hash.to_vec(),
        }),
    }
}

pub(crate) fn commit_sig_to_proto(sig: &CommitSig) -> proto::CommitSig {
    let flag = match sig.flag() {
        crate::BlockIdFlag::Absent => proto::BlockIdFlag::Absent,
        crate::BlockIdFlag::Commit => proto::BlockIdFlag::Commit,
        crate::BlockIdFlag::Nil => proto::BlockIdFlag::Nil,
    };

    proto::CommitSig {
        block_id_flag: flag as i32,
        validator_address: sig
            .validator_address()
            .map(Address::to_vec)
            .unwrap_or_default(),
        timestamp: sig.timestamp().as_ref().map(timestamp_to_proto),
        signature: sig
            .signature()
            .map(|s| s.to_bytes().to_vec())
            .unwrap_or_default(),
    }
}

//----------------------------------------
// VoteType

impl TryFrom<SignedMsgType> for VoteType {
    type Error = Error;

    fn try_from(value: SignedMsgType) -> Result<Self, Error> {
        match value {
            SignedMsgType::Prevote => Ok(VoteType::Prevote),
            SignedMsgType::Precommit => Ok(VoteType::Precommit),
            other => Err(Error::invalid_field(
                "Vote",
                "vote_type",
                format!("not a vote type: {other:?}"),
            )),
        }
    }
}

impl From<VoteType> for SignedMsgType {
    fn from(vote_type: VoteType) -> Self {
        vote_type.signed_msg_type()
    }
}

//----------------------------------------
// PartSetHeader, BlockId

impl Protobuf for PartSetHeader {
    type Proto = proto::PartSetHeader;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        Ok(Self {
            total: proto.total,
            hash: hash_from_proto(&proto.hash, "PartSetHeader", "hash")?,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::PartSetHeader {
            total: self.total,
            hash: self.hash.to_vec(),
        })
    }
}

impl Protobuf for BlockId {
    type Proto = proto::BlockId;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        let part_set_header = match proto.part_set_header {
            Some(psh) => PartSetHeader::from_proto(psh)?,
            None => PartSetHeader::zero(),
        };

        Ok(Self {
            hash: hash_from_proto(&proto.hash, "BlockId", "hash")?,
            part_set_header,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(block_id_to_proto(self))
    }
}

fn block_id_from_proto(
    block_id: Option<proto::BlockId>,
    type_name: &'static str,
) -> Result<BlockId, Error> {
    match block_id {
        Some(block_id) => BlockId::from_proto(block_id),
        None => Err(Error::missing_field(type_name, "block_id")),
    }
}

//----------------------------------------
// Vote, Proposal

impl Protobuf for Vote {
    type Proto = proto::Vote;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        let msg_type = SignedMsgType::try_from(proto.vote_type)
            .map_err(|_| Error::invalid_field("Vote", "vote_type", proto.vote_type))?;

        // An absent block id on the wire is a nil vote.
        let block_id = match proto.block_id {
            Some(block_id) => BlockId::from_proto(block_id)?,
            None => BlockId::zero(),
        };

        Ok(Self {
            vote_type: VoteType::try_from(msg_type)?,
            height: Height::new(proto.height),
            round: round_from_proto(proto.round, "Vote")?,
            block_id,
            timestamp: timestamp_from_proto(proto.timestamp, "Vote")?,
            validator_address: address_from_proto(
                &proto.validator_address,
                "Vote",
                "validator_address",
            )?,
            validator_index: proto.validator_index,
            signature: signature_from_proto(&proto.signature, "Vote")?,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::Vote {
            vote_type: self.vote_type.signed_msg_type() as i32,
            height: self.height.as_u64(),
            round: self.round.as_i32(),
            block_id: if self.block_id.is_zero() {
                None
            } else {
                Some(block_id_to_proto(&self.block_id))
            },
            timestamp: Some(timestamp_to_proto(&self.timestamp)),
            validator_address: self.validator_address.to_vec(),
            validator_index: self.validator_index,
            signature: self.signature.to_bytes().to_vec(),
        })
    }
}

fn round_from_proto(round: i32, type_name: &'static str) -> Result<Round, Error> {
    if round < -1 {
        return Err(Error::invalid_field(type_name, "round", round));
    }
    Ok(Round::new(round))
}

impl Protobuf for Proposal {
    type Proto = proto::Proposal;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        Ok(Self {
            height: Height::new(proto.height),
            round: round_from_proto(proto.round, "Proposal")?,
            pol_round: round_from_proto(proto.pol_round, "Proposal")?,
            block_id: block_id_from_proto(proto.block_id, "Proposal")?,
            timestamp: timestamp_from_proto(proto.timestamp, "Proposal")?,
            signature: signature_from_proto(&proto.signature, "Proposal")?,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::Proposal {
            height: self.height.as_u64(),
            round: self.round.as_i32(),
            pol_round: self.pol_round.as_i32(),
            block_id: Some(block_id_to_proto(&self.block_id)),
            timestamp: Some(timestamp_to_proto(&self.timestamp)),
            signature: self.signature.to_bytes().to_vec(),
        })
    }
}

//----------------------------------------
// CommitSig, Commit

impl Protobuf for CommitSig {
    type Proto = proto::CommitSig;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        let flag = proto::BlockIdFlag::try_from(proto.block_id_flag)
            .map_err(|_| Error::invalid_field("CommitSig", "block_id_flag", proto.block_id_flag))?;

        match flag {
            proto::BlockIdFlag::Absent => Ok(CommitSig::Absent),
            proto::BlockIdFlag::Commit => Ok(CommitSig::Commit {
                validator_address: address_from_proto(
                    &proto.validator_address,
                    "CommitSig",
                    "validator_address",
                )?,
                timestamp: timestamp_from_proto(proto.timestamp, "CommitSig")?,
                signature: signature_from_proto(&proto.signature, "CommitSig")?,
            }),
            proto::BlockIdFlag::Nil => Ok(CommitSig::Nil {
                validator_address: address_from_proto(
                    &proto.validator_address,
                    "CommitSig",
                    "validator_address",
                )?,
                timestamp: timestamp_from_proto(proto.timestamp, "CommitSig")?,
                signature: signature_from_proto(&proto.signature, "CommitSig")?,
            }),
            proto::BlockIdFlag::Unknown => Err(Error::invalid_field(
                "CommitSig",
                "block_id_flag",
                "unknown flag",
            )),
        }
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(commit_sig_to_proto(self))
    }
}

impl Protobuf for Commit {
    type Proto = proto::Commit;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        Ok(Self {
            height: Height::new(proto.height),
            round: round_from_proto(proto.round, "Commit")?,
            block_id: block_id_from_proto(proto.block_id, "Commit")?,
            signatures: proto
                .signatures
                .into_iter()
                .map(CommitSig::from_proto)
                .collect::<Result<_, _>>()?,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::Commit {
            height: self.height.as_u64(),
            round: self.round.as_i32(),
            block_id: Some(block_id_to_proto(&self.block_id)),
            signatures: self.signatures.iter().map(commit_sig_to_proto).collect(),
        })
    }
}

//----------------------------------------
// Header, Block, BlockMeta

impl Protobuf for Header {
    type Proto = proto::Header;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        let last_block_id = match proto.last_block_id {
            Some(block_id) => BlockId::from_proto(block_id)?,
            None => BlockId::zero(),
        };

        Ok(Self {
            chain_id: proto.chain_id,
            height: Height::new(proto.height),
            time: timestamp_from_proto(proto.time, "Header")?,
            last_block_id,
            last_commit_hash: hash_from_proto(&proto.last_commit_hash, "Header", "last_commit_hash")?,
            data_hash: hash_from_proto(&proto.data_hash, "Header", "data_hash")?,
            validators_hash: hash_from_proto(&proto.validators_hash, "Header", "validators_hash")?,
            next_validators_hash: hash_from_proto(
                &proto.next_validators_hash,
                "Header",
                "next_validators_hash",
            )?,
            app_hash: hash_from_proto(&proto.app_hash, "Header", "app_hash")?,
            last_results_hash: hash_from_proto(
                &proto.last_results_hash,
                "Header",
                "last_results_hash",
            )?,
            evidence_hash: hash_from_proto(&proto.evidence_hash, "Header", "evidence_hash")?,
            proposer_address: address_from_proto(
                &proto.proposer_address,
                "Header",
                "proposer_address",
            )?,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::Header {
            chain_id: self.chain_id.clone(),
            height: self.height.as_u64(),
            time: Some(timestamp_to_proto(&self.time)),
            last_block_id: if self.last_block_id.is_zero() {
                None
            } else {
                Some(block_id_to_proto(&self.last_block_id))
            },
            last_commit_hash: self.last_commit_hash.to_vec(),
            data_hash: self.data_hash.to_vec(),
            validators_hash: self.validators_hash.to_vec(),
            next_validators_hash: self.next_validators_hash.to_vec(),
            app_hash: self.app_hash.to_vec(),
            last_results_hash: self.last_results_hash.to_vec(),
            evidence_hash: self.evidence_hash.to_vec(),
            proposer_address: self.proposer_address.to_vec(),
        })
    }
}

impl Protobuf for Block {
    type Proto = proto::Block;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        let header = proto
            .header
            .ok_or_else(|| Error::missing_field("Block", "header"))
            .and_then(Header::from_proto)?;

        let last_commit = proto.last_commit.map(Commit::from_proto).transpose()?;

        Ok(Self {
            header,
            data: proto.data.into_iter().map(Transaction::new).collect(),
            evidence: proto.evidence,
            last_commit,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::Block {
            header: Some(self.header.to_proto()?),
            data: self.data.iter().map(|tx| tx.as_bytes().to_vec()).collect(),
            evidence: self.evidence.clone(),
            last_commit: self
                .last_commit
                .as_ref()
                .map(Commit::to_proto)
                .transpose()?,
        })
    }
}

impl Protobuf for BlockMeta {
    type Proto = proto::BlockMeta;

    fn from_proto(proto: Self::Proto) -> Result<Self, Error> {
        let header = proto
            .header
            .ok_or_else(|| Error::missing_field("BlockMeta", "header"))
            .and_then(Header::from_proto)?;

        Ok(Self {
            block_id: block_id_from_proto(proto.block_id, "BlockMeta")?,
            block_size: proto.block_size,
            header,
            num_txs: proto.num_txs,
        })
    }

    fn to_proto(&self) -> Result<Self::Proto, Error> {
        Ok(proto::BlockMeta {
            block_id: Some(block_id_to_proto(&self.block_id)),
            block_size: self.block_size,
            header: Some(self.header.to_proto()?),
            num_txs: self.num_txs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PrivateKey, Signature};

    fn sample_header() -> Header {
        let key = PrivateKey::from_bytes([5; 32]);
        Header {
            chain_id: "baron-chain".to_string(),
            height: Height::new(3),
            time: Timestamp::from_unix_parts(1_700_000_000, 99).unwrap(),
            last_block_id: BlockId::new(
                Hash::sha3_of(b"prev"),
                PartSetHeader::new(1, Hash::sha3_of(b"prev-parts")),
            ),
            last_commit_hash: Hash::sha3_of(b"last-commit"),
            data_hash: Hash::sha3_of(b"data"),
            validators_hash: Hash::sha3_of(b"vals"),
            next_validators_hash: Hash::sha3_of(b"next-vals"),
            app_hash: Hash::sha3_of(b"app"),
            last_results_hash: Hash::sha3_of(b"results"),
            evidence_hash: Hash::sha3_of(b"evidence"),
            proposer_address: Address::from_public_key(&key.public_key()),
        }
    }

    #[test]
    fn header_round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes().unwrap();
        assert_eq!(Header::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn vote_round_trip() {
        let key = PrivateKey::from_bytes([6; 32]);
        let vote = Vote {
            vote_type: VoteType::Prevote,
            height: Height::new(1),
            round: Round::new(0),
            block_id: BlockId::zero(),
            timestamp: Timestamp::from_unix_parts(100, 0).unwrap(),
            validator_address: Address::from_public_key(&key.public_key()),
            validator_index: 2,
            signature: Signature::zero(),
        };

        let bytes = vote.to_bytes().unwrap();
        assert_eq!(Vote::from_bytes(&bytes).unwrap(), vote);
    }

    #[test]
    fn block_round_trip() {
        let block = Block {
            header: sample_header(),
            data: vec![Transaction::new(b"tx-1".to_vec()), Transaction::new(b"tx-2".to_vec())],
            evidence: vec![],
            last_commit: Some(Commit {
                height: Height::new(2),
                round: Round::new(0),
                block_id: BlockId::new(
                    Hash::sha3_of(b"prev"),
                    PartSetHeader::new(1, Hash::sha3_of(b"prev-parts")),
                ),
                signatures: vec![CommitSig::Absent],
            }),
        };

        let bytes = block.to_bytes().unwrap();
        assert_eq!(Block::from_bytes(&bytes).unwrap(), block);
    }
}
