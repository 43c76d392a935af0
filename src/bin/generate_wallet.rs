use empowernet_core::signer::LedgerSigner;

// 生成一个新的锚定账户，把私钥写进 .env 的 PRIVATE_KEY
fn main() {
    let signer = LedgerSigner::generate();

    println!("---------------------------------------");
    println!("NEW WALLET GENERATED SUCCESSFULLY");
    println!("---------------------------------------");
    println!("Public Address: {:#x}", signer.address());
    println!("Private Key:    {}", signer.private_key_hex());
    println!("---------------------------------------");
    println!("IMPORTANT: Save this Private Key in your .env file as PRIVATE_KEY.");
    println!("NEVER share this key with anyone or commit it to version control.");
    println!("---------------------------------------");
}
