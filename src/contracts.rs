//! 工作流与任务用到的合约 ABI 及常用地址。

use alloy::primitives::{Address, address};
use alloy::sol;

/// CoW Protocol GPv2Settlement，用于 presign 订单。
pub const GPV2_SETTLEMENT: Address = address!("0x9008D19f58AAbD9eD0D60971565AA8510560ab41");
/// CoW Protocol VaultRelayer，卖出代币需要对其授权。
pub const COWSWAP_RELAYER: Address = address!("0xC92E8bdf79f0507f65a392b0ab4667716BFE0110");
/// Safe v1.3.0 MultiSendCallOnly。
pub const MULTISEND_CALL_ONLY: Address = address!("0x40A2aCCbd92BCA938b02010E17A5b8929b49130D");

sol! {
    #[derive(Debug, PartialEq, Eq)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function decimals() external view returns (uint8);
        function approve(address spender, uint256 amount) external returns (bool);
        function transfer(address to, uint256 amount) external returns (bool);
        function transferFrom(address from, address to, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
        event Approval(address indexed owner, address indexed spender, uint256 value);
    }

    #[derive(Debug, PartialEq, Eq)]
    interface GPv2Settlement {
        function setPreSignature(bytes orderUid, bool signed) external;
    }

    #[derive(Debug, PartialEq, Eq)]
    interface MultiSendCallOnly {
        function multiSend(bytes transactions) external payable;
    }

    /// Safe 的 EIP-712 交易结构，签名与 safeTxHash 均基于它计算。
    #[derive(Debug, PartialEq, Eq)]
    struct SafeTx {
        address to;
        uint256 value;
        bytes data;
        uint8 operation;
        uint256 safeTxGas;
        uint256 baseGas;
        uint256 gasPrice;
        address gasToken;
        address refundReceiver;
        uint256 nonce;
    }
}
