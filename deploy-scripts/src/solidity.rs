//! Definitions of Solidity functions called when managing proxies

use alloy_sol_types::sol;

sol! {
    // ERC1967 / UUPS implementation upgrade, called on the proxy itself
    function upgradeToAndCall(address newImplementation, bytes memory data) external payable;

    // `ProxyAdmin` upgrade of a transparent proxy
    function upgradeAndCall(address proxy, address implementation, bytes memory data) external payable;

    // `UpgradeableBeacon` upgrade
    function upgradeTo(address newImplementation) external;

    // `UpgradeableBeacon` implementation getter
    function implementation() external view returns (address);
}
