//! Static call-id table.
//!
//! The transport indexes every message by a 32-bit call id; each call
//! carries a pair of format signatures describing how its request and
//! response payloads are encoded. The table is fixed by the protocol and
//! never changes at runtime.

use crate::error::ProtocolError;

/// Call id of the generic ERROR response. Response-only: a server that
/// cannot execute a call answers with this id and a trailing result code.
pub const CALL_ERROR: u32 = 0;

/// One entry of the call table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallDescriptor {
    pub id: u32,
    pub name: &'static str,
    pub request_format: &'static str,
    pub response_format: &'static str,
}

macro_rules! call {
    ($id:expr, $name:expr, $req:expr, $resp:expr) => {
        CallDescriptor {
            id: $id,
            name: $name,
            request_format: $req,
            response_format: $resp,
        }
    };
}

/// The complete call table, indexed by call id.
pub static CALLS: [CallDescriptor; 68] = [
    call!(0, "ERROR", "", ""),
    call!(1, "C_Initialize", "ay", ""),
    call!(2, "C_Finalize", "", ""),
    call!(3, "C_GetInfo", "", "vsusv"),
    call!(4, "C_GetSlotList", "yfu", "au"),
    call!(5, "C_GetSlotInfo", "u", "ssuvv"),
    call!(6, "C_GetTokenInfo", "u", "ssssuuuuuuuuuuuvvs"),
    call!(7, "C_GetMechanismList", "ufu", "au"),
    call!(8, "C_GetMechanismInfo", "uu", "uuu"),
    call!(9, "C_InitToken", "uays", ""),
    call!(10, "C_WaitForSlotEvent", "u", "u"),
    call!(11, "C_OpenSession", "uu", "u"),
    call!(12, "C_CloseSession", "u", ""),
    call!(13, "C_CloseAllSessions", "u", ""),
    call!(14, "C_GetFunctionStatus", "u", ""),
    call!(15, "C_CancelFunction", "u", ""),
    call!(16, "C_GetSessionInfo", "u", "uuuu"),
    call!(17, "C_InitPIN", "uay", ""),
    call!(18, "C_SetPIN", "uayay", ""),
    call!(19, "C_GetOperationState", "ufy", "ay"),
    call!(20, "C_SetOperationState", "uayuu", ""),
    call!(21, "C_Login", "uuay", ""),
    call!(22, "C_Logout", "u", ""),
    call!(23, "C_CreateObject", "uaA", "u"),
    call!(24, "C_CopyObject", "uuaA", "u"),
    call!(25, "C_DestroyObject", "uu", ""),
    call!(26, "C_GetObjectSize", "uu", "u"),
    call!(27, "C_GetAttributeValue", "uufA", "aAu"),
    call!(28, "C_SetAttributeValue", "uuaA", ""),
    call!(29, "C_FindObjectsInit", "uaA", ""),
    call!(30, "C_FindObjects", "ufu", "au"),
    call!(31, "C_FindObjectsFinal", "u", ""),
    call!(32, "C_EncryptInit", "uMu", ""),
    call!(33, "C_Encrypt", "uayfy", "ay"),
    call!(34, "C_EncryptUpdate", "uayfy", "ay"),
    call!(35, "C_EncryptFinal", "ufy", "ay"),
    call!(36, "C_DecryptInit", "uMu", ""),
    call!(37, "C_Decrypt", "uayfy", "ay"),
    call!(38, "C_DecryptUpdate", "uayfy", "ay"),
    call!(39, "C_DecryptFinal", "ufy", "ay"),
    call!(40, "C_DigestInit", "uM", ""),
    call!(41, "C_Digest", "uayfy", "ay"),
    call!(42, "C_DigestUpdate", "uay", ""),
    call!(43, "C_DigestKey", "uu", ""),
    call!(44, "C_DigestFinal", "ufy", "ay"),
    call!(45, "C_SignInit", "uMu", ""),
    call!(46, "C_Sign", "uayfy", "ay"),
    call!(47, "C_SignUpdate", "uay", ""),
    call!(48, "C_SignFinal", "ufy", "ay"),
    call!(49, "C_SignRecoverInit", "uMu", ""),
    call!(50, "C_SignRecover", "uayfy", "ay"),
    call!(51, "C_VerifyInit", "uMu", ""),
    call!(52, "C_Verify", "uayay", ""),
    call!(53, "C_VerifyUpdate", "uay", ""),
    call!(54, "C_VerifyFinal", "uay", ""),
    call!(55, "C_VerifyRecoverInit", "uMu", ""),
    call!(56, "C_VerifyRecover", "uayfy", "ay"),
    call!(57, "C_DigestEncryptUpdate", "uayfy", "ay"),
    call!(58, "C_DecryptDigestUpdate", "uayfy", "ay"),
    call!(59, "C_SignEncryptUpdate", "uayfy", "ay"),
    call!(60, "C_DecryptVerifyUpdate", "uayfy", "ay"),
    call!(61, "C_GenerateKey", "uMaA", "u"),
    call!(62, "C_GenerateKeyPair", "uMaAaA", "uu"),
    call!(63, "C_WrapKey", "uMuufy", "ay"),
    call!(64, "C_UnwrapKey", "uMuayaA", "u"),
    call!(65, "C_DeriveKey", "uMuaA", "u"),
    call!(66, "C_SeedRandom", "uay", ""),
    call!(67, "C_GenerateRandom", "ufy", "ay"),
];

/// Looks up the descriptor for a call id.
///
/// Valid ids are zero-indexed, so the bound check is `id >= len`: the table
/// size itself is already out of range.
pub fn lookup(id: u32) -> Result<&'static CallDescriptor, ProtocolError> {
    if id as usize >= CALLS.len() {
        return Err(ProtocolError::UnknownCall(id));
    }
    Ok(&CALLS[id as usize])
}

impl CallDescriptor {
    /// The expected format signature for one message direction.
    pub fn format(&self, direction: crate::message::Direction) -> &'static str {
        match direction {
            crate::message::Direction::Request => self.request_format,
            crate::message::Direction::Response => self.response_format,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_shape() {
        assert_eq!(CALLS.len(), 68);
        for (i, call) in CALLS.iter().enumerate() {
            assert_eq!(call.id as usize, i, "ids must be contiguous from 0");
        }
        assert_eq!(CALLS[CALL_ERROR as usize].name, "ERROR");
    }

    #[test]
    fn test_lookup_known() {
        let call = lookup(4).unwrap();
        assert_eq!(call.name, "C_GetSlotList");
        assert_eq!(call.request_format, "yfu");
        assert_eq!(call.response_format, "au");

        let call = lookup(6).unwrap();
        assert_eq!(call.name, "C_GetTokenInfo");
        assert_eq!(call.response_format, "ssssuuuuuuuuuuuvvs");
    }

    #[test]
    fn test_lookup_boundary() {
        // Highest valid id.
        assert_eq!(lookup(67).unwrap().name, "C_GenerateRandom");
        // The table size itself must be rejected.
        assert!(matches!(
            lookup(CALLS.len() as u32),
            Err(ProtocolError::UnknownCall(68))
        ));
        assert!(matches!(
            lookup(u32::MAX),
            Err(ProtocolError::UnknownCall(_))
        ));
    }

    #[test]
    fn test_array_and_buffer_codes_carry_operands() {
        // Every 'a' and 'f' in the table must be followed by an element code.
        for call in CALLS.iter() {
            for fmt in [call.request_format, call.response_format] {
                let mut chars = fmt.chars();
                while let Some(c) = chars.next() {
                    if c == 'a' || c == 'f' {
                        assert!(
                            chars.next().is_some(),
                            "{}: dangling {:?} in {:?}",
                            call.name,
                            c,
                            fmt
                        );
                    }
                }
            }
        }
    }
}
